use std::path::PathBuf ;
use std::sync::Arc ;
use walkdir::WalkDir ;

use crate::manifest::ManifestSerializer ;
use crate::package::{ ArchiveStorage, DirectoryStorage };
use super::{ PackageResolver, PackageStream, ResolutionError, read_package };



/// Discovers every package below a root directory.
///
/// The tree is walked depth first in file name order. A directory holding a manifest file
/// is a package and is not descended into further; a file with one of the
/// [`ArchiveStorage::EXTENSIONS`] is an archived package. Everything else is ignored.
/// The root itself is never treated as a package.
///
/// The walk is lazy: directories are only listed as the stream is polled.
pub struct RecursiveResolver {
	root: PathBuf,
	manifest_name: String,
	serializer: Arc<dyn ManifestSerializer>,
}

impl RecursiveResolver {

	pub fn new(
		root: impl Into<PathBuf>,
		manifest_name: impl Into<String>,
		serializer: Arc<dyn ManifestSerializer>,
	) -> Self {
		Self { root: root.into(), manifest_name: manifest_name.into(), serializer }
	}

	#[inline] pub fn root( &self ) -> &std::path::Path { &self.root }

}

impl PackageResolver for RecursiveResolver {
	fn resolve_packages( &self ) -> PackageStream<'_> {

		let mut walker = WalkDir::new( &self.root ).min_depth( 1 ).sort_by_file_name().into_iter();

		Box::new( std::iter::from_fn( move || loop {

			let entry = match walker.next()? {
				Ok( entry ) => entry,
				Err( err ) => {
					let location = err.path().unwrap_or( &self.root ).display().to_string();
					return Some( Err( ResolutionError::UnreadableSource { location, source: err.into() }));
				}
			};

			if entry.file_type().is_dir() {
				if entry.path().join( &self.manifest_name ).is_file() {
					walker.skip_current_dir();
					return Some( read_package(
						Arc::new( DirectoryStorage::new( entry.path() )),
						&self.manifest_name,
						self.serializer.as_ref(),
					));
				}
			} else if ArchiveStorage::is_archive( entry.path() ) {
				return Some( match ArchiveStorage::load( entry.path() ) {
					Ok( storage ) => read_package( Arc::new( storage ), &self.manifest_name, self.serializer.as_ref() ),
					Err( source ) => Err( ResolutionError::UnreadableSource { location: entry.path().display().to_string(), source }),
				});
			}

		}))

	}
}
