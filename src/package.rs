//! Packages: a manifest bound to the content it was discovered with.
//!
//! A [`PluginPackage`] is the unit that flows through resolution and loading. Its content
//! lives behind a shared [`PackageStorage`]; clones and narrowed views share the same
//! storage, which is released when the last of them is dropped.

mod storage ;

pub use storage::{
	PackageStorage, DirectoryStorage, ArchiveStorage, NestedStorage, CaseInsensitiveStorage,
	copy_to_directory, normalise_path,
};

use std::sync::Arc ;
use std::sync::atomic::{ AtomicU64, Ordering };

use crate::manifest::Manifest ;



/// Process-unique identity of a discovered package.
///
/// Assigned once when the package is first created; views produced by
/// [`PluginPackage::narrow`] and [`PluginPackage::with_storage`] keep it, so every
/// component keyed by package identity sees them as the same package.
#[derive( Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash )]
pub struct PackageId( u64 );

impl PackageId {
	fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new( 0 );
		Self( NEXT.fetch_add( 1, Ordering::Relaxed ))
	}
}

impl std::fmt::Display for PackageId {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result { write!( f, "#{}", self.0 )}
}

/// A manifest plus the content tree it was read from.
///
/// # Type Parameters
/// - `M`: Manifest type. Resolvers produce `PluginPackage<Manifest>`; loaders may narrow it
/// 	to a more specific manifest type with [`narrow`]( Self::narrow ).
#[derive( Debug, Clone )]
pub struct PluginPackage<M = Manifest> {
	id: PackageId,
	manifest: M,
	storage: Arc<dyn PackageStorage>,
}

impl<M> PluginPackage<M> {

	/// Creates a package with a fresh identity.
	pub fn new( manifest: M, storage: Arc<dyn PackageStorage> ) -> Self {
		Self { id: PackageId::next(), manifest, storage }
	}

	#[inline] pub fn id( &self ) -> PackageId { self.id }
	#[inline] pub fn manifest( &self ) -> &M { &self.manifest }
	#[inline] pub fn storage( &self ) -> &Arc<dyn PackageStorage> { &self.storage }

	/// Human readable location of the package content.
	#[inline] pub fn location( &self ) -> String { self.storage.location() }

	/// Reads a content entry.
	///
	/// # Errors
	/// Fails with [`std::io::ErrorKind::NotFound`] if the entry does not exist, or with any
	/// error raised by the backing storage.
	pub fn read( &self, path: &str ) -> std::io::Result<Vec<u8>> { self.storage.read( path )}

	/// Same package seen through a different manifest type.
	pub fn narrow<N>( &self, manifest: N ) -> PluginPackage<N> {
		PluginPackage { id: self.id, manifest, storage: Arc::clone( &self.storage )}
	}

	/// Same package and manifest with its content served from `storage`.
	pub fn with_storage( self, storage: Arc<dyn PackageStorage> ) -> Self {
		Self { storage, ..self }
	}

	/// Releases this handle on the package content.
	///
	/// Backing resources (open archives, staged copies) go away once every clone and view
	/// of the package has been disposed or dropped.
	pub fn dispose( self ) {
		tracing::trace!( package = %self.id, location = %self.storage.location(), "Disposing package handle" );
	}

	pub fn into_manifest( self ) -> M { self.manifest }

}
