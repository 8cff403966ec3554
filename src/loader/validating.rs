use crate::package::PluginPackage ;
use super::{ CanLoad, LoadError, LoadSuccess, PluginLoader, describe };



/// Checks every plugin the inner loader produces.
///
/// A plugin failing the check is dropped and reported as [`LoadError::Validation`], which
/// carries the warnings collected while loading it.
pub struct ValidatingLoader<L, F> {
	inner: L,
	validate: F,
}

impl<L, F> ValidatingLoader<L, F> {
	pub fn new( inner: L, validate: F ) -> Self { Self { inner, validate }}
}

impl<M, L, F> PluginLoader<M> for ValidatingLoader<L, F>
where
	M: std::fmt::Display,
	L: PluginLoader<M>,
	F: Fn( &L::Plugin ) -> Result<(), String>,
{
	type Plugin = L::Plugin ;

	fn can_load( &self, package: &PluginPackage<M> ) -> CanLoad { self.inner.can_load( package )}

	fn load( &self, package: &PluginPackage<M> ) -> Result<LoadSuccess<Self::Plugin>, LoadError> {
		let success = self.inner.load( package )?;
		match ( self.validate )( &success.plugin ) {
			Ok(()) => Ok( success ),
			Err( message ) => Err( LoadError::Validation { package: describe( package ), message, warnings: success.warnings }),
		}
	}
}
