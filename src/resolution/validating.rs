use crate::package::PluginPackage ;
use super::{ PackageResolver, PackageStream, ResolutionError, describe };



/// Turns packages rejected by a predicate into [`ResolutionError::Validation`] entries.
///
/// The predicate returns the rejection message on failure. Errors from the inner
/// resolver pass through untouched.
pub struct ValidatingResolver<R, F> {
	inner: R,
	validate: F,
}

impl<R, F> ValidatingResolver<R, F>
where
	R: PackageResolver,
	F: Fn( &PluginPackage ) -> Result<(), String>,
{
	pub fn new( inner: R, validate: F ) -> Self { Self { inner, validate }}
}

impl<R, F> PackageResolver for ValidatingResolver<R, F>
where
	R: PackageResolver,
	F: Fn( &PluginPackage ) -> Result<(), String>,
{
	fn resolve_packages( &self ) -> PackageStream<'_> {
		Box::new( self.inner.resolve_packages().map(| outcome | {
			let resolved = outcome?;
			match ( self.validate )( &resolved.package ) {
				Ok(()) => Ok( resolved ),
				Err( message ) => {
					let package = describe( &resolved.package );
					resolved.package.dispose();
					Err( ResolutionError::Validation { package, message })
				}
			}
		}))
	}
}
