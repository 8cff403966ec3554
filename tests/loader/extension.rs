use wasm_plugin_loader::{
	CanLoad, ComponentLoader, DefaultContext, DispatchError, Engine, Linker, LoadError,
	NarrowingLoader, PluginLoader, Val,
};
use crate::fixtures::{ ANSWER, AMBIGUOUS, NO_EXTENSION, TRAPPING, package, plugin, read_package };

fn loader( engine: &Engine ) -> NarrowingLoader<ComponentLoader<DefaultContext>, fn( &wasm_plugin_loader::Manifest ) -> Result<wasm_plugin_loader::ComponentManifest, String>> {
	NarrowingLoader::components( ComponentLoader::new( engine, Linker::new( engine )))
}

#[test]
fn extension_is_found_and_callable() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "answer", &[], ANSWER ));
	let engine = Engine::default();
	let loader = loader( &engine );

	assert_eq!( loader.can_load( &package ), CanLoad::Yes );
	let success = loader.load( &package ).unwrap();
	assert_no_warnings!( success.warnings );

	let extension = success.plugin ;
	assert_eq!( extension.export(), "acme:test/extension" );
	assert_eq!( extension.constructor(), "" );
	assert!( extension.state().is_empty() );
	assert_eq!( extension.functions().collect::<Vec<_>>(), vec![ "answer" ]);
	assert!( matches!( extension.call( "answer", &[] ).unwrap()[..], [ Val::U32( 42 )]));

}

#[test]
fn extension_debug_names_its_package() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "answer", &[], ANSWER ));
	let engine = Engine::default();

	let extension = loader( &engine ).load( &package ).unwrap().plugin ;
	assert_eq!( extension.unit().package(), package.id() );

	let debug = format!( "{:?}", extension );
	assert!( debug.starts_with( "ExtensionInstance" ));
	assert!( debug.contains( "acme:test/extension" ));

}

#[test]
fn missing_extension_is_an_error() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "service", &[], NO_EXTENSION ));
	let engine = Engine::default();

	match loader( &engine ).load( &package ) {
		Err( LoadError::NoExtension { contract, .. }) => assert_eq!( contract, "extension" ),
		result => panic!( "Expected NoExtension, found: {:?}", result.map(| success | success.warnings )),
	}

}

#[test]
fn contract_name_is_configurable() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "service", &[], NO_EXTENSION ));
	let engine = Engine::default();
	let loader = NarrowingLoader::components( ComponentLoader::<DefaultContext>::new( &engine, Linker::new( &engine )).with_contract( "service" ));

	let extension = loader.load( &package ).unwrap().plugin ;
	assert_eq!( extension.export(), "acme:test/service" );

}

#[test]
fn several_extensions_are_ambiguous() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "twice", &[], AMBIGUOUS ));
	let engine = Engine::default();

	match loader( &engine ).load( &package ) {
		Err( LoadError::AmbiguousExtension { candidates, .. }) => {
			assert_eq!( candidates.len(), 2 );
			assert!( candidates.iter().any(| name | name == "acme:one/extension" ));
			assert!( candidates.iter().any(| name | name == "acme:two/extension" ));
		},
		result => panic!( "Expected AmbiguousExtension, found: {:?}", result.map(| success | success.warnings )),
	}

}

#[test]
fn non_component_entry_is_not_claimed() {

	let root = tempfile::tempdir().unwrap();
	let path = package( root.path(), "jar", "uniqueName = \"jar\"\nversion = \"1.0\"\nentry = \"plugin.jar\"\n", &[( "plugin.jar", "" )]);
	let engine = Engine::default();

	assert_eq!( loader( &engine ).can_load( &read_package( &path )), CanLoad::No );

}

#[test]
fn missing_entry_is_refused() {

	let root = tempfile::tempdir().unwrap();
	let path = package( root.path(), "empty", "uniqueName = \"empty\"\nversion = \"1.0\"\n", &[]);
	let engine = Engine::default();

	assert!( matches!( loader( &engine ).can_load( &read_package( &path )), CanLoad::Error( _ )));

}

#[test]
fn invalid_component_fails_to_compile() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "garbage", &[], "(component (this is not wat" ));
	let engine = Engine::default();

	assert!( matches!( loader( &engine ).load( &package ), Err( LoadError::Compile { .. })));

}

#[test]
fn dispatch_errors_are_values() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "trapping", &[], TRAPPING ));
	let engine = Engine::default();
	let extension = loader( &engine ).load( &package ).unwrap().plugin ;

	assert!( matches!( extension.call( "boom", &[] ), Err( DispatchError::RuntimeException( _ ))));
	assert!( matches!( extension.call( "missing", &[] ), Err( DispatchError::InvalidFunction( name )) if name.ends_with( "#missing" )));
	assert!( matches!( extension.call_method( "answer", &[] ), Err( DispatchError::MissingState( _ ))));

}

#[test]
fn packages_get_separate_units() {

	let root = tempfile::tempdir().unwrap();
	let first = read_package( &plugin( root.path(), "first", &[], ANSWER ));
	let second = read_package( &plugin( root.path(), "second", &[], ANSWER ));
	let engine = Engine::default();
	let loader = ComponentLoader::<DefaultContext>::new( &engine, Linker::new( &engine ));
	let contexts = loader.contexts().clone();
	let loader = NarrowingLoader::components( loader );

	let first = loader.load( &first ).unwrap().plugin ;
	let second = loader.load( &second ).unwrap().plugin ;
	assert_eq!( contexts.live_units(), 2 );
	assert_ne!( first.unit().package(), second.unit().package() );

	assert!( first.close() );
	assert_eq!( contexts.live_units(), 1 );
	assert!( matches!( second.call( "answer", &[] ).unwrap()[..], [ Val::U32( 42 )]));

}
