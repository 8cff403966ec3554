use std::collections::HashSet ;
use std::io::Write ;
use std::path::{ Path, PathBuf };
use std::sync::{ Mutex, PoisonError };
use std::sync::atomic::{ AtomicU64, Ordering };
use serde::{ Deserialize, Serialize };
use sha2::{ Digest, Sha256 };
use tempfile::NamedTempFile ;

use super::{ CodeEditor, EditError, EditOutput };



/// What is stored next to the cached code.
#[derive( Debug, Serialize, Deserialize )]
struct CacheRecord {
	descriptor: String,
	messages: Vec<String>,
	has_symbols: bool,
}

/// Hit and miss counters of a [`CachingCodeEditor`].
#[derive( Copy, Clone, Debug, Default, PartialEq, Eq )]
pub struct CacheStats {
	pub hits: u64,
	pub misses: u64,
}

/// Caches the output of another [`CodeEditor`] on disk.
///
/// Entries are addressed by the SHA-256 of the input code and symbols. Each entry is made
/// of up to three files in the cache directory:
/// - `<hash>.code`: edited code
/// - `<hash>.symbols`: edited symbols, if any
/// - `<hash>.json`: the descriptor of the editor that produced it and its messages
///
/// A hit requires the recorded descriptor to match the wrapped editor's current one. The
/// record is written last and every file is written to a temporary file first and then
/// renamed into place, so concurrent writers of the same hash never expose a partial
/// entry: the last rename wins and both wrote identical content.
///
/// The cache is used in sessions. Call [`finish_session`]( Self::finish_session ) once
/// loading is over to evict every entry that was not used since the previous call.
pub struct CachingCodeEditor<E> {
	inner: E,
	directory: PathBuf,
	touched: Mutex<HashSet<String>>,
	hits: AtomicU64,
	misses: AtomicU64,
}

impl<E: CodeEditor> CachingCodeEditor<E> {

	/// Wraps `inner`, creating `directory` if needed.
	///
	/// # Errors
	/// Fails if the directory cannot be created.
	pub fn new( inner: E, directory: impl Into<PathBuf> ) -> Result<Self, EditError> {
		let directory = directory.into();
		std::fs::create_dir_all( &directory ).map_err(| source | EditError::Cache { path: directory.clone(), source })?;
		Ok( Self { inner, directory, touched: Mutex::new( HashSet::new() ), hits: AtomicU64::new( 0 ), misses: AtomicU64::new( 0 )})
	}

	#[inline] pub fn inner( &self ) -> &E { &self.inner }
	#[inline] pub fn directory( &self ) -> &Path { &self.directory }

	pub fn stats( &self ) -> CacheStats {
		CacheStats { hits: self.hits.load( Ordering::Relaxed ), misses: self.misses.load( Ordering::Relaxed )}
	}

	/// Content address of an input.
	pub fn cache_key( code: &[u8], symbols: Option<&[u8]> ) -> String {
		let mut hasher = Sha256::new();
		hasher.update(( code.len() as u64 ).to_le_bytes() );
		hasher.update( code );
		match symbols {
			Some( symbols ) => { hasher.update([ 1u8 ]); hasher.update( symbols ); },
			Option::None => hasher.update([ 0u8 ]),
		}
		hex::encode( hasher.finalize() )
	}

	/// Ends the current session, evicting every entry that was not used during it or was
	/// produced under another descriptor.
	///
	/// Returns the number of evicted entries.
	///
	/// # Errors
	/// Fails if the cache directory cannot be listed or an entry cannot be removed.
	pub fn finish_session( &self ) -> Result<usize, EditError> {

		let touched = std::mem::take( &mut *self.touched.lock().unwrap_or_else( PoisonError::into_inner ));
		let descriptor = self.inner.descriptor();
		let cache_error = | path: &Path | { let path = path.to_path_buf(); move | source: std::io::Error | EditError::Cache { path, source }};

		let mut evicted = HashSet::new();
		for entry in std::fs::read_dir( &self.directory ).map_err( cache_error( &self.directory ))? {
			let path = entry.map_err( cache_error( &self.directory ))?.path();
			let Some( key ) = path.file_stem().and_then(| stem | stem.to_str() ) else { continue };
			if !is_cache_key( key ) { continue }
			let stale = !touched.contains( key ) || !self.record_matches( key, &descriptor );
			if stale {
				std::fs::remove_file( &path ).map_err( cache_error( &path ))?;
				evicted.insert( key.to_string() );
			}
		}

		tracing::debug!( evicted = evicted.len(), kept = touched.len(), "Finished code cache session" );
		Ok( evicted.len() )

	}

	fn path( &self, key: &str, extension: &str ) -> PathBuf {
		self.directory.join( format!( "{}.{}", key, extension ))
	}

	fn record_matches( &self, key: &str, descriptor: &str ) -> bool {
		self.read_record( key ).is_ok_and(| record | record.descriptor == descriptor )
	}

	fn read_record( &self, key: &str ) -> Result<CacheRecord, EditError> {
		let path = self.path( key, "json" );
		let bytes = std::fs::read( &path ).map_err(| source | EditError::Cache { path: path.clone(), source })?;
		serde_json::from_slice( &bytes ).map_err(| source | EditError::Record { path, source })
	}

	fn lookup( &self, key: &str, descriptor: &str ) -> Result<Option<EditOutput>, EditError> {

		if !self.path( key, "json" ).is_file() { return Ok( None ) }
		let record = self.read_record( key )?;
		if record.descriptor != descriptor { return Ok( None ) }

		let read = | extension: &str | {
			let path = self.path( key, extension );
			std::fs::read( &path ).map_err(| source | EditError::Cache { path, source })
		};
		let code = read( "code" )?;
		let symbols = match record.has_symbols {
			true => Some( read( "symbols" )? ),
			false => None,
		};

		Ok( Some( EditOutput { code, symbols, messages: record.messages }))

	}

	fn store( &self, key: &str, descriptor: &str, output: &EditOutput ) -> Result<(), EditError> {
		self.write_atomic( &self.path( key, "code" ), &output.code )?;
		if let Some( symbols ) = &output.symbols { self.write_atomic( &self.path( key, "symbols" ), symbols )?; }
		let record = CacheRecord {
			descriptor: descriptor.to_string(),
			messages: output.messages.clone(),
			has_symbols: output.symbols.is_some(),
		};
		let path = self.path( key, "json" );
		let bytes = serde_json::to_vec_pretty( &record ).map_err(| source | EditError::Record { path: path.clone(), source })?;
		self.write_atomic( &path, &bytes )
	}

	fn write_atomic( &self, path: &Path, bytes: &[u8] ) -> Result<(), EditError> {
		let cache_error = | source: std::io::Error | EditError::Cache { path: path.to_path_buf(), source };
		let mut file = NamedTempFile::new_in( &self.directory ).map_err( cache_error )?;
		file.write_all( bytes ).map_err( cache_error )?;
		file.persist( path ).map_err(| err | cache_error( err.error ))?;
		Ok(())
	}

}

impl<E: CodeEditor> CodeEditor for CachingCodeEditor<E> {

	fn descriptor( &self ) -> String { self.inner.descriptor() }

	fn edit( &self, name: &str, code: &[u8], symbols: Option<&[u8]> ) -> Result<EditOutput, EditError> {

		let key = Self::cache_key( code, symbols );
		let descriptor = self.inner.descriptor();
		self.touched.lock().unwrap_or_else( PoisonError::into_inner ).insert( key.clone() );

		match self.lookup( &key, &descriptor ) {
			Ok( Some( output )) => {
				self.hits.fetch_add( 1, Ordering::Relaxed );
				tracing::trace!( %name, %key, "Code cache hit" );
				return Ok( output );
			},
			Ok( None ) => {},
			Err( err ) => tracing::warn!( %name, %key, error = %err, "Ignoring unreadable code cache entry" ),
		}

		self.misses.fetch_add( 1, Ordering::Relaxed );
		let output = self.inner.edit( name, code, symbols )?;
		if let Err( err ) = self.store( &key, &descriptor, &output ) {
			tracing::warn!( %name, %key, error = %err, "Failed to cache edited code" );
		}
		Ok( output )

	}

}

fn is_cache_key( name: &str ) -> bool {
	name.len() == 64 && name.bytes().all(| byte | byte.is_ascii_hexdigit() )
}

#[cfg( test )]
mod tests {

	use super::* ;
	use std::sync::atomic::AtomicUsize ;

	struct Uppercase { version: &'static str, runs: AtomicUsize }

	impl CodeEditor for Uppercase {
		fn descriptor( &self ) -> String { format!( "uppercase/{}", self.version )}
		fn edit( &self, _name: &str, code: &[u8], symbols: Option<&[u8]> ) -> Result<EditOutput, EditError> {
			self.runs.fetch_add( 1, Ordering::SeqCst );
			Ok( EditOutput {
				code: code.to_ascii_uppercase(),
				symbols: symbols.map( <[u8]>::to_vec ),
				messages: vec![ "uppercased".to_string() ],
			})
		}
	}

	fn editor( version: &'static str ) -> Uppercase { Uppercase { version, runs: AtomicUsize::new( 0 )}}

	#[test]
	fn second_edit_is_served_from_disk() {
		let directory = tempfile::tempdir().unwrap();
		let cache = CachingCodeEditor::new( editor( "1" ), directory.path() ).unwrap();
		let first = cache.edit( "demo", b"abc", Some( b"map" )).unwrap();
		let second = cache.edit( "demo", b"abc", Some( b"map" )).unwrap();
		assert_eq!( first, second );
		assert_eq!( second.code, b"ABC" );
		assert_eq!( cache.inner().runs.load( Ordering::SeqCst ), 1 );
		assert_eq!( cache.stats(), CacheStats { hits: 1, misses: 1 });
	}

	#[test]
	fn changed_descriptor_invalidates_entries() {
		let directory = tempfile::tempdir().unwrap();
		CachingCodeEditor::new( editor( "1" ), directory.path() ).unwrap().edit( "demo", b"abc", None ).unwrap();
		let cache = CachingCodeEditor::new( editor( "2" ), directory.path() ).unwrap();
		cache.edit( "demo", b"abc", None ).unwrap();
		assert_eq!( cache.stats(), CacheStats { hits: 0, misses: 1 });
	}

	#[test]
	fn untouched_entries_are_evicted_at_session_end() {
		let directory = tempfile::tempdir().unwrap();
		let cache = CachingCodeEditor::new( editor( "1" ), directory.path() ).unwrap();
		cache.edit( "old", b"old", None ).unwrap();
		assert_eq!( cache.finish_session().unwrap(), 0 );
		cache.edit( "new", b"new", None ).unwrap();
		assert_eq!( cache.finish_session().unwrap(), 1 );
		let old = CachingCodeEditor::<Uppercase>::cache_key( b"old", None );
		assert!( !directory.path().join( format!( "{}.code", old )).exists() );
	}

}
