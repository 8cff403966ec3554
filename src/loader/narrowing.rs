use crate::manifest::Manifest ;
use crate::package::PluginPackage ;
use super::{ CanLoad, LoadError, LoadSuccess, PluginLoader };



/// Adapts a loader of manifest type `N` to packages of manifest type `M`.
///
/// The converter turns the broad manifest into the narrow one, failing with a reason when
/// the package is not of the expected kind. Such packages are answered [`CanLoad::No`].
/// The narrowed package keeps the identity and content of the original.
pub struct NarrowingLoader<L, F> {
	inner: L,
	convert: F,
}

impl<L, F> NarrowingLoader<L, F> {
	pub fn new( inner: L, convert: F ) -> Self { Self { inner, convert }}
}

impl<M, N, L, F> PluginLoader<M> for NarrowingLoader<L, F>
where
	L: PluginLoader<N>,
	F: Fn( &M ) -> Result<N, String>,
{
	type Plugin = L::Plugin ;

	fn can_load( &self, package: &PluginPackage<M> ) -> CanLoad {
		match ( self.convert )( package.manifest() ) {
			Ok( narrow ) => self.inner.can_load( &package.narrow( narrow )),
			Err( reason ) => {
				tracing::trace!( package = %package.id(), %reason, "Manifest does not narrow" );
				CanLoad::No
			}
		}
	}

	/// # Panics
	/// Panics if the manifest cannot be converted, which [`can_load`]( Self::can_load ) would
	/// have reported as [`CanLoad::No`].
	fn load( &self, package: &PluginPackage<M> ) -> Result<LoadSuccess<Self::Plugin>, LoadError> {
		let narrow = match ( self.convert )( package.manifest() ) {
			Ok( narrow ) => narrow,
			Err( reason ) => panic!( "load called for package {} whose manifest does not narrow: {}", package.id(), reason ),
		};
		self.inner.load( &package.narrow( narrow ))
	}
}

impl<L> NarrowingLoader<L, fn( &Manifest ) -> Result<super::ComponentManifest, String>>
where
	L: PluginLoader<super::ComponentManifest>,
{
	/// Narrows to [`ComponentManifest`]( super::ComponentManifest ) with
	/// [`ComponentManifest::narrow`]( super::ComponentManifest::narrow ).
	pub fn components( inner: L ) -> Self { Self::new( inner, super::ComponentManifest::narrow )}
}
