use std::collections::VecDeque ;
use std::sync::Arc ;

use crate::manifest::ManifestSerializer ;
use crate::package::{ NestedStorage, PackageStorage };
use super::{ PackageResolver, PackageStream, ResolveOutcome, ResolutionError, read_package };



/// Nesting depth past which subplugin declarations are no longer followed.
const MAX_DEPTH: usize = 16 ;

/// Adds the subplugins each package declares right after the package itself.
///
/// A subplugin is a directory inside its parent's content, named by
/// [`Manifest::subplugins`]( crate::Manifest::subplugins ), that holds its own manifest.
/// Subplugins may declare subplugins of their own. Their content is a view into the
/// parent storage, so an archive is only ever read once.
///
/// Subplugins are independent packages: they get their own identity and are loaded like
/// any other package.
pub struct SubpluginResolver<R> {
	inner: R,
	manifest_name: String,
	serializer: Arc<dyn ManifestSerializer>,
}

impl<R: PackageResolver> SubpluginResolver<R> {

	pub fn new( inner: R, manifest_name: impl Into<String>, serializer: Arc<dyn ManifestSerializer> ) -> Self {
		Self { inner, manifest_name: manifest_name.into(), serializer }
	}

	fn expand( &self, outcome: ResolveOutcome ) -> Vec<ResolveOutcome> {

		let mut expanded = Vec::new();
		let mut queue = VecDeque::from([ ( outcome, 0 ) ]);

		while let Some(( outcome, depth )) = queue.pop_front() {
			if let Ok( resolved ) = &outcome {
				let storage = resolved.package.storage();
				for root in resolved.package.manifest().subplugins() {
					let nested = match depth < MAX_DEPTH {
						true => self.read_nested( storage, root ),
						false => Err( ResolutionError::UnreadableSource {
							location: format!( "{}!/{}", storage.location(), root ),
							source: std::io::Error::other( "Subplugins nested too deeply" ),
						}),
					};
					queue.push_back(( nested, depth + 1 ));
				}
			}
			expanded.push( outcome );
		}

		expanded

	}

	fn read_nested( &self, parent: &Arc<dyn PackageStorage>, root: &str ) -> ResolveOutcome {
		let storage = NestedStorage::new( Arc::clone( parent ), root )
			.map_err(| source | ResolutionError::UnreadableSource { location: format!( "{}!/{}", parent.location(), root ), source })?;
		read_package( Arc::new( storage ), &self.manifest_name, self.serializer.as_ref() )
	}

}

impl<R: PackageResolver> PackageResolver for SubpluginResolver<R> {
	fn resolve_packages( &self ) -> PackageStream<'_> {
		Box::new( self.inner.resolve_packages().flat_map(| outcome | self.expand( outcome )))
	}
}
