//! Content trees backing a package.

use std::collections::{ BTreeMap, HashMap };
use std::fs::File ;
use std::io::{ self, Read };
use std::path::{ Component, Path, PathBuf };
use std::sync::Arc ;
use flate2::read::GzDecoder ;
use itertools::Itertools ;
use walkdir::WalkDir ;



/// Read access to the named content entries of a package.
///
/// Paths are relative and `/`-separated (see [`normalise_path`]). Implementations must
/// not expose anything outside their root.
pub trait PackageStorage: Send + Sync + std::fmt::Debug {

	/// Human readable location, used in diagnostics.
	fn location( &self ) -> String ;

	/// Opens an entry as a byte stream.
	///
	/// # Errors
	/// [`io::ErrorKind::NotFound`] if there is no such entry,
	/// [`io::ErrorKind::InvalidInput`] if the path escapes the root.
	fn open( &self, path: &str ) -> io::Result<Box<dyn Read + '_>> ;

	/// Whether an entry exists.
	fn contains( &self, path: &str ) -> bool ;

	/// Every file entry, as normalised relative paths.
	///
	/// # Errors
	/// Propagates failures of the backing store while listing.
	fn entries( &self ) -> io::Result<Vec<String>> ;

	/// Reads a whole entry into memory.
	///
	/// # Errors
	/// Same as [`open`]( Self::open ), plus read failures.
	fn read( &self, path: &str ) -> io::Result<Vec<u8>> {
		let mut buffer = Vec::new();
		self.open( path )?.read_to_end( &mut buffer )?;
		Ok( buffer )
	}

}

/// Normalises a package-relative path to `a/b/c` form.
///
/// `.` components and redundant separators are dropped; backslashes are treated as
/// separators.
///
/// # Errors
/// Returns [`io::ErrorKind::InvalidInput`] for absolute paths, `..` components and empty
/// paths.
pub fn normalise_path( path: &str ) -> io::Result<String> {

	let unified = path.replace( '\\', "/" );
	if unified.starts_with( '/' ) {
		return Err( io::Error::new( io::ErrorKind::InvalidInput, format!( "Absolute path not allowed: {}", path )));
	}

	let segments = unified.split( '/' )
		.filter(| segment | !segment.is_empty() && *segment != "." )
		.map(| segment | match segment {
			".." => Err( io::Error::new( io::ErrorKind::InvalidInput, format!( "Path escapes package root: {}", path ))),
			segment => Ok( segment ),
		})
		.collect::<io::Result<Vec<_>>>()?;

	match segments.is_empty() {
		true => Err( io::Error::new( io::ErrorKind::InvalidInput, "Empty path" )),
		false => Ok( segments.join( "/" )),
	}

}

fn not_found( location: &str, path: &str ) -> io::Error {
	io::Error::new( io::ErrorKind::NotFound, format!( "{} has no entry '{}'", location, path ))
}

/// A package laid out as a plain directory.
#[derive( Debug, Clone )]
pub struct DirectoryStorage {
	root: PathBuf,
}

impl DirectoryStorage {
	pub fn new( root: impl Into<PathBuf> ) -> Self { Self { root: root.into() }}
	#[inline] pub fn root( &self ) -> &Path { &self.root }

	fn resolve( &self, path: &str ) -> io::Result<PathBuf> {
		Ok( normalise_path( path )?.split( '/' ).fold( self.root.clone(), | acc, segment | acc.join( segment )))
	}
}

impl PackageStorage for DirectoryStorage {

	fn location( &self ) -> String { self.root.display().to_string() }

	fn open( &self, path: &str ) -> io::Result<Box<dyn Read + '_>> {
		let full_path = self.resolve( path )?;
		match full_path.is_file() {
			true => Ok( Box::new( File::open( full_path )? )),
			false => Err( not_found( &self.location(), path )),
		}
	}

	fn contains( &self, path: &str ) -> bool {
		self.resolve( path ).is_ok_and(| full_path | full_path.is_file() )
	}

	fn entries( &self ) -> io::Result<Vec<String>> {
		WalkDir::new( &self.root )
			.min_depth( 1 )
			.sort_by_file_name()
			.into_iter()
			.filter_ok(| entry | entry.file_type().is_file() )
			.map(| entry | {
				let entry = entry.map_err( io::Error::from )?;
				let relative = entry.path().strip_prefix( &self.root )
					.map_err(| err | io::Error::new( io::ErrorKind::InvalidData, err ))?;
				Ok( relative.components()
					.filter_map(| component | match component {
						Component::Normal( segment ) => Some( segment.to_string_lossy().into_owned() ),
						_ => None,
					})
					.join( "/" ))
			})
			.collect()
	}

}

/// A package shipped as a `.tar`, `.tar.gz` or `.tgz` archive.
///
/// The archive is indexed into memory when opened; dropping the storage releases it.
pub struct ArchiveStorage {
	path: PathBuf,
	entries: BTreeMap<String, Vec<u8>>,
}

impl ArchiveStorage {

	/// File name suffixes recognised as package archives.
	pub const EXTENSIONS: [&'static str; 3] = [ ".tar", ".tar.gz", ".tgz" ];

	/// Whether `path` looks like a package archive.
	pub fn is_archive( path: &Path ) -> bool {
		let name = path.file_name().map(| name | name.to_string_lossy().to_lowercase() ).unwrap_or_default();
		Self::EXTENSIONS.iter().any(| extension | name.ends_with( extension ))
	}

	/// Opens and indexes an archive.
	///
	/// # Errors
	/// Fails if the file cannot be read, is not a valid (optionally gzip compressed) tar
	/// archive, or contains entries escaping the archive root.
	pub fn load( path: impl Into<PathBuf> ) -> io::Result<Self> {

		let path = path.into();
		let file = File::open( &path )?;
		let name = path.to_string_lossy().to_lowercase();
		let reader: Box<dyn Read> = match name.ends_with( ".gz" ) || name.ends_with( ".tgz" ) {
			true => Box::new( GzDecoder::new( file )),
			false => Box::new( file ),
		};

		let mut archive = tar::Archive::new( reader );
		let mut entries = BTreeMap::new();
		for entry in archive.entries()? {
			let mut entry = entry?;
			if !entry.header().entry_type().is_file() { continue }
			let entry_path = normalise_path( &entry.path()?.to_string_lossy() )?;
			let mut data = Vec::new();
			entry.read_to_end( &mut data )?;
			entries.insert( entry_path, data );
		}

		tracing::debug!( archive = %path.display(), entries = entries.len(), "Indexed package archive" );
		Ok( Self { path, entries })

	}

	#[inline] pub fn path( &self ) -> &Path { &self.path }

}

impl std::fmt::Debug for ArchiveStorage {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ArchiveStorage" )
			.field( "path", &self.path )
			.field( "entries", &self.entries.len() )
			.finish()
	}
}

impl PackageStorage for ArchiveStorage {

	fn location( &self ) -> String { self.path.display().to_string() }

	fn open( &self, path: &str ) -> io::Result<Box<dyn Read + '_>> {
		let key = normalise_path( path )?;
		self.entries.get( &key )
			.map(| data | Box::new( data.as_slice() ) as Box<dyn Read + '_> )
			.ok_or_else(|| not_found( &self.location(), path ))
	}

	fn contains( &self, path: &str ) -> bool {
		normalise_path( path ).is_ok_and(| key | self.entries.contains_key( &key ))
	}

	fn entries( &self ) -> io::Result<Vec<String>> { Ok( self.entries.keys().cloned().collect() )}

}

/// A sub-root of another storage, used for packages embedded in a parent package.
#[derive( Debug, Clone )]
pub struct NestedStorage {
	parent: Arc<dyn PackageStorage>,
	prefix: String,
}

impl NestedStorage {

	/// Roots a view of `parent` at `prefix`.
	///
	/// # Errors
	/// Returns [`io::ErrorKind::InvalidInput`] if `prefix` escapes the parent root.
	pub fn new( parent: Arc<dyn PackageStorage>, prefix: &str ) -> io::Result<Self> {
		Ok( Self { parent, prefix: normalise_path( prefix )? })
	}

	fn resolve( &self, path: &str ) -> io::Result<String> {
		Ok( format!( "{}/{}", self.prefix, normalise_path( path )? ))
	}
}

impl PackageStorage for NestedStorage {

	fn location( &self ) -> String { format!( "{}!/{}", self.parent.location(), self.prefix )}

	fn open( &self, path: &str ) -> io::Result<Box<dyn Read + '_>> {
		self.parent.open( &self.resolve( path )? )
	}

	fn contains( &self, path: &str ) -> bool {
		self.resolve( path ).is_ok_and(| full_path | self.parent.contains( &full_path ))
	}

	fn entries( &self ) -> io::Result<Vec<String>> {
		let prefix = format!( "{}/", self.prefix );
		Ok( self.parent.entries()?.into_iter()
			.filter_map(| entry | entry.strip_prefix( &prefix ).map( str::to_string ))
			.collect() )
	}

}

/// Serves entries regardless of the case they are requested in.
///
/// An exact match always wins; otherwise the lookup falls back to the first entry (in
/// sorted order) whose lowercase form matches.
#[derive( Debug )]
pub struct CaseInsensitiveStorage {
	inner: Arc<dyn PackageStorage>,
	index: HashMap<String, String>,
}

impl CaseInsensitiveStorage {

	/// Indexes the entries of `inner`.
	///
	/// # Errors
	/// Propagates failures listing the entries of `inner`.
	pub fn new( inner: Arc<dyn PackageStorage> ) -> io::Result<Self> {
		let mut index = HashMap::new();
		for entry in inner.entries()?.into_iter().sorted() {
			index.entry( entry.to_lowercase() ).or_insert( entry );
		}
		Ok( Self { inner, index })
	}

	fn resolve( &self, path: &str ) -> io::Result<String> {
		let normalised = normalise_path( path )?;
		Ok( match self.inner.contains( &normalised ) {
			true => normalised,
			false => self.index.get( &normalised.to_lowercase() ).cloned().unwrap_or( normalised ),
		})
	}
}

impl PackageStorage for CaseInsensitiveStorage {

	fn location( &self ) -> String { self.inner.location() }

	fn open( &self, path: &str ) -> io::Result<Box<dyn Read + '_>> {
		self.inner.open( &self.resolve( path )? )
	}

	fn contains( &self, path: &str ) -> bool {
		self.resolve( path ).is_ok_and(| actual | self.inner.contains( &actual ))
	}

	fn entries( &self ) -> io::Result<Vec<String>> { self.inner.entries() }

}

/// Copies every entry of `storage` below `destination`, creating directories as needed.
///
/// # Errors
/// Fails on the first entry that cannot be read or written.
pub fn copy_to_directory( storage: &dyn PackageStorage, destination: &Path ) -> io::Result<DirectoryStorage> {

	std::fs::create_dir_all( destination )?;
	for entry in storage.entries()? {
		let target = entry.split( '/' ).fold( destination.to_path_buf(), | acc, segment | acc.join( segment ));
		if let Some( parent ) = target.parent() { std::fs::create_dir_all( parent )?; }
		let mut source = storage.open( &entry )?;
		let mut file = File::create( &target )?;
		io::copy( &mut source, &mut file )?;
	}

	Ok( DirectoryStorage::new( destination ))

}

#[cfg( test )]
mod tests {
	use super::* ;

	#[test]
	fn normalise_rejects_escapes() {
		assert_eq!( normalise_path( "./a//b\\c.wasm" ).unwrap(), "a/b/c.wasm" );
		assert_eq!( normalise_path( "../secret" ).unwrap_err().kind(), io::ErrorKind::InvalidInput );
		assert_eq!( normalise_path( "/etc/passwd" ).unwrap_err().kind(), io::ErrorKind::InvalidInput );
		assert_eq!( normalise_path( "./" ).unwrap_err().kind(), io::ErrorKind::InvalidInput );
	}

	#[test]
	fn case_insensitive_lookup_falls_back_to_folded_names() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write( dir.path().join( "Plugin.WASM" ), b"code" ).unwrap();
		std::fs::write( dir.path().join( "Readme.md" ), b"readme" ).unwrap();

		let storage = CaseInsensitiveStorage::new( Arc::new( DirectoryStorage::new( dir.path() ))).unwrap();
		assert_eq!( storage.read( "Plugin.WASM" ).unwrap(), b"code" );
		assert_eq!( storage.read( "plugin.wasm" ).unwrap(), b"code" );
		assert_eq!( storage.read( "README.MD" ).unwrap(), b"readme" );
		assert!( storage.contains( "PLUGIN.wasm" ));
		assert!( !storage.contains( "missing.txt" ));
	}

	#[test]
	fn nested_storage_lists_only_its_subtree() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::create_dir_all( dir.path().join( "sub/inner" )).unwrap();
		std::fs::write( dir.path().join( "top.txt" ), b"top" ).unwrap();
		std::fs::write( dir.path().join( "sub/inner/leaf.txt" ), b"leaf" ).unwrap();

		let parent: Arc<dyn PackageStorage> = Arc::new( DirectoryStorage::new( dir.path() ));
		let nested = NestedStorage::new( parent, "sub" ).unwrap();
		assert_eq!( nested.entries().unwrap(), vec![ "inner/leaf.txt".to_string() ]);
		assert_eq!( nested.read( "inner/leaf.txt" ).unwrap(), b"leaf" );
		assert!( nested.read( "../top.txt" ).is_err() );
	}
}
