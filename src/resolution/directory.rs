use std::path::PathBuf ;
use std::sync::Arc ;

use crate::manifest::ManifestSerializer ;
use crate::package::{ ArchiveStorage, DirectoryStorage };
use super::{ PackageResolver, PackageStream, ResolutionError, read_package };



/// Produces the single package rooted at a directory.
///
/// Nothing is read until the stream is polled.
pub struct DirectoryResolver {
	root: PathBuf,
	manifest_name: String,
	serializer: Arc<dyn ManifestSerializer>,
}

impl DirectoryResolver {

	pub fn new(
		root: impl Into<PathBuf>,
		manifest_name: impl Into<String>,
		serializer: Arc<dyn ManifestSerializer>,
	) -> Self {
		Self { root: root.into(), manifest_name: manifest_name.into(), serializer }
	}

	#[inline] pub fn root( &self ) -> &std::path::Path { &self.root }

}

impl PackageResolver for DirectoryResolver {
	fn resolve_packages( &self ) -> PackageStream<'_> {
		Box::new( std::iter::once_with(|| read_package(
			Arc::new( DirectoryStorage::new( &self.root )),
			&self.manifest_name,
			self.serializer.as_ref(),
		)))
	}
}

/// Produces the single package contained in a tar archive.
///
/// The archive may be plain or gzip compressed (see [`ArchiveStorage::EXTENSIONS`]).
/// Its entries are read into memory and shared by every view of the package.
pub struct ArchiveResolver {
	path: PathBuf,
	manifest_name: String,
	serializer: Arc<dyn ManifestSerializer>,
}

impl ArchiveResolver {

	pub fn new(
		path: impl Into<PathBuf>,
		manifest_name: impl Into<String>,
		serializer: Arc<dyn ManifestSerializer>,
	) -> Self {
		Self { path: path.into(), manifest_name: manifest_name.into(), serializer }
	}

	#[inline] pub fn path( &self ) -> &std::path::Path { &self.path }

}

impl PackageResolver for ArchiveResolver {
	fn resolve_packages( &self ) -> PackageStream<'_> {
		Box::new( std::iter::once_with(|| {
			let storage = ArchiveStorage::load( &self.path )
				.map_err(| source | ResolutionError::UnreadableSource { location: self.path.display().to_string(), source })?;
			read_package( Arc::new( storage ), &self.manifest_name, self.serializer.as_ref() )
		}))
	}
}

#[cfg( test )]
mod tests {

	use super::* ;
	use crate::manifest::TomlManifestSerializer ;

	#[test]
	fn directory_without_manifest_is_reported() {
		let root = tempfile::tempdir().unwrap();
		let resolver = DirectoryResolver::new( root.path(), "manifest.toml", Arc::new( TomlManifestSerializer ));
		let outcomes = resolver.resolve_packages().collect::<Vec<_>>();
		assert_eq!( outcomes.len(), 1 );
		assert!( matches!( outcomes[0], Err( ResolutionError::MissingManifest { .. })));
	}

	#[test]
	fn missing_archive_is_reported() {
		let root = tempfile::tempdir().unwrap();
		let resolver = ArchiveResolver::new( root.path().join( "absent.tar" ), "manifest.toml", Arc::new( TomlManifestSerializer ));
		let outcomes = resolver.resolve_packages().collect::<Vec<_>>();
		assert!( matches!( outcomes[..], [ Err( ResolutionError::UnreadableSource { .. })]));
	}

}
