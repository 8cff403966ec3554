use std::sync::Arc ;
use std::sync::atomic::{ AtomicUsize, Ordering };
use wasm_plugin_loader::{
	CacheStats, CachingCodeEditor, CodeEditor, ComponentLoader, DefaultContext, EditError, EditOutput,
	Engine, Linker, LoadError, NarrowingLoader, PluginLoader, Val,
};
use crate::fixtures::{ ANSWER, plugin, read_package };

/// Swaps one constant for another in text components.
struct Rewriter {
	to: &'static str,
	runs: AtomicUsize,
}

impl Rewriter {
	fn new( to: &'static str ) -> Self { Self { to, runs: AtomicUsize::new( 0 )}}
}

impl CodeEditor for Rewriter {

	fn descriptor( &self ) -> String { format!( "rewriter:{}", self.to )}

	fn edit( &self, name: &str, code: &[u8], symbols: Option<&[u8]> ) -> Result<EditOutput, EditError> {
		self.runs.fetch_add( 1, Ordering::SeqCst );
		let text = std::str::from_utf8( code ).map_err(| err | EditError::Failed {
			editor: self.descriptor(),
			name: name.to_string(),
			message: err.to_string(),
		})?;
		if !text.contains( "i32.const 42" ) {
			return Err( EditError::Failed { editor: self.descriptor(), name: name.to_string(), message: "nothing to rewrite".to_string() });
		}
		Ok( EditOutput {
			code: text.replace( "i32.const 42", &format!( "i32.const {}", self.to )).into_bytes(),
			symbols: symbols.map( <[u8]>::to_vec ),
			messages: vec![ format!( "{}: rewrote answer to {}", name, self.to )],
		})
	}

}

fn loader( engine: &Engine, editor: Arc<dyn CodeEditor> ) -> impl PluginLoader<Plugin = wasm_plugin_loader::ExtensionInstance<DefaultContext>> {
	NarrowingLoader::components( ComponentLoader::<DefaultContext>::new( engine, Linker::new( engine )).with_editor( editor ))
}

#[test]
fn edited_code_is_compiled_and_messages_become_warnings() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "edited", &[], ANSWER ));
	let engine = Engine::default();

	let success = loader( &engine, Arc::new( Rewriter::new( "7" ))).load( &package ).unwrap();

	assert_eq!( success.warnings, vec![ "edited: rewrote answer to 7".to_string() ]);
	assert!( matches!( success.plugin.call( "answer", &[] ).unwrap()[..], [ Val::U32( 7 )]));

}

#[test]
fn editor_failure_is_a_load_error() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "untouchable", &[], crate::fixtures::NO_EXTENSION ));
	let engine = Engine::default();

	let result = loader( &engine, Arc::new( Rewriter::new( "7" ))).load( &package );
	assert!( matches!( result, Err( LoadError::Edit { source: EditError::Failed { .. }, .. })));

}

#[test]
fn cached_output_is_reused_with_its_messages() {

	let root = tempfile::tempdir().unwrap();
	let cache = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "cached", &[], ANSWER ));
	let engine = Engine::default();

	let editor = Arc::new( CachingCodeEditor::new( Rewriter::new( "9" ), cache.path() ).unwrap() );
	let loader = loader( &engine, editor.clone() );

	let first = loader.load( &package ).unwrap();
	let second = loader.load( &package ).unwrap();

	assert_eq!( editor.stats(), CacheStats { hits: 1, misses: 1 });
	assert_eq!( editor.inner().runs.load( Ordering::SeqCst ), 1 );
	assert_eq!( first.warnings, second.warnings );
	assert!( matches!( second.plugin.call( "answer", &[] ).unwrap()[..], [ Val::U32( 9 )]));

}

#[test]
fn changed_descriptor_invalidates_the_cache() {

	let cache = tempfile::tempdir().unwrap();
	let code = ANSWER.as_bytes();

	let before = CachingCodeEditor::new( Rewriter::new( "1" ), cache.path() ).unwrap();
	before.edit( "demo", code, None ).unwrap();

	let after = CachingCodeEditor::new( Rewriter::new( "2" ), cache.path() ).unwrap();
	let output = after.edit( "demo", code, None ).unwrap();

	assert_eq!( after.stats(), CacheStats { hits: 0, misses: 1 });
	assert!( String::from_utf8( output.code ).unwrap().contains( "i32.const 2" ));

}

#[test]
fn finishing_a_session_evicts_unused_entries() {

	let cache = tempfile::tempdir().unwrap();
	let editor = CachingCodeEditor::new( Rewriter::new( "3" ), cache.path() ).unwrap();
	let other = ANSWER.replace( "acme:test", "acme:other" );

	editor.edit( "kept", ANSWER.as_bytes(), None ).unwrap();
	editor.edit( "dropped", other.as_bytes(), Some( b"symbols" )).unwrap();
	assert_eq!( editor.finish_session().unwrap(), 0 );

	editor.edit( "kept", ANSWER.as_bytes(), None ).unwrap();
	assert_eq!( editor.finish_session().unwrap(), 1 );

	let remaining = std::fs::read_dir( cache.path() ).unwrap()
		.map(| entry | entry.unwrap().file_name().to_string_lossy().into_owned() )
		.collect::<Vec<_>>();
	let kept = CachingCodeEditor::<Rewriter>::cache_key( ANSWER.as_bytes(), None );
	assert!( remaining.iter().all(| name | name.starts_with( &kept )), "Unexpected cache content: {:?}", remaining );

}
