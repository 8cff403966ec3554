use crate::package::PluginPackage ;
use super::{ CanLoad, LoadError, LoadSuccess, PluginLoader };



/// Restricts a loader to packages matching a predicate.
///
/// Packages failing the predicate are answered [`CanLoad::No`] without consulting the
/// inner loader.
pub struct ConditionalLoader<L, F> {
	inner: L,
	condition: F,
}

impl<L, F> ConditionalLoader<L, F> {
	pub fn new( inner: L, condition: F ) -> Self { Self { inner, condition }}
}

impl<M, L, F> PluginLoader<M> for ConditionalLoader<L, F>
where
	L: PluginLoader<M>,
	F: Fn( &PluginPackage<M> ) -> bool,
{
	type Plugin = L::Plugin ;

	fn can_load( &self, package: &PluginPackage<M> ) -> CanLoad {
		match ( self.condition )( package ) {
			true => self.inner.can_load( package ),
			false => CanLoad::No,
		}
	}

	fn load( &self, package: &PluginPackage<M> ) -> Result<LoadSuccess<Self::Plugin>, LoadError> {
		self.inner.load( package )
	}
}
