use crate::manifest::Manifest ;
use crate::package::PluginPackage ;
use super::{ CanLoad, LoadError, LoadSuccess, PluginLoader, describe };



type BoxedLoader<P, M> = Box<dyn PluginLoader<M, Plugin = P> + Send + Sync> ;

/// Tries several loaders in order.
///
/// A package is accepted if any child accepts it, and is loaded by the first child that
/// does. When no child accepts it, the first [`CanLoad::Error`] is reported, or
/// [`CanLoad::No`] if every child declined.
pub struct ExtendableLoader<P, M = Manifest> {
	loaders: Vec<BoxedLoader<P, M>>,
}

impl<P, M> Default for ExtendableLoader<P, M> {
	fn default() -> Self { Self { loaders: Vec::new() }}
}

impl<P, M> ExtendableLoader<P, M> {

	pub fn new() -> Self { Self::default() }

	pub fn with( mut self, loader: impl PluginLoader<M, Plugin = P> + Send + Sync + 'static ) -> Self {
		self.push( loader );
		self
	}

	pub fn push( &mut self, loader: impl PluginLoader<M, Plugin = P> + Send + Sync + 'static ) {
		self.loaders.push( Box::new( loader ));
	}

	#[inline] pub fn len( &self ) -> usize { self.loaders.len() }
	#[inline] pub fn is_empty( &self ) -> bool { self.loaders.is_empty() }

}

impl<P, M: std::fmt::Display> PluginLoader<M> for ExtendableLoader<P, M> {

	type Plugin = P ;

	fn can_load( &self, package: &PluginPackage<M> ) -> CanLoad {
		let mut first_error = None ;
		for loader in &self.loaders {
			match loader.can_load( package ) {
				CanLoad::Yes => return CanLoad::Yes,
				CanLoad::Error( reason ) => { first_error.get_or_insert( reason ); },
				CanLoad::No => {},
			}
		}
		first_error.map_or( CanLoad::No, CanLoad::Error )
	}

	fn load( &self, package: &PluginPackage<M> ) -> Result<LoadSuccess<P>, LoadError> {
		self.loaders.iter()
			.find(| loader | loader.can_load( package ) == CanLoad::Yes )
			.ok_or_else(|| LoadError::NoLoader { package: describe( package ) })?
			.load( package )
	}

}
