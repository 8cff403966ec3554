use std::collections::{ HashMap, HashSet };

use crate::package::PluginPackage ;
use super::{ PackageResolver, PackageStream, ResolutionError, describe };



/// Rejects every package whose key is shared with another package.
///
/// All packages of an ambiguous group are dropped and replaced with a single
/// [`ResolutionError::DuplicateKey`] naming each of them, emitted where the first member of
/// the group appeared. Unique packages and inner errors keep their relative order.
///
/// Needs to see the whole inner stream before producing anything.
pub struct DistinctResolver<R, K> {
	inner: R,
	key: K,
}

impl<R, K> DistinctResolver<R, K>
where
	R: PackageResolver,
	K: Fn( &PluginPackage ) -> String,
{
	pub fn new( inner: R, key: K ) -> Self { Self { inner, key }}
}

impl<R: PackageResolver> DistinctResolver<R, fn( &PluginPackage ) -> String> {
	/// Rejects packages sharing a unique name.
	pub fn by_unique_name( inner: R ) -> Self {
		Self::new( inner, | package | package.manifest().unique_name().to_string() )
	}
}

impl<R, K> PackageResolver for DistinctResolver<R, K>
where
	R: PackageResolver,
	K: Fn( &PluginPackage ) -> String,
{
	fn resolve_packages( &self ) -> PackageStream<'_> {

		let outcomes = self.inner.resolve_packages()
			.map(| outcome | {
				let key = outcome.as_ref().ok().map(| resolved | ( self.key )( &resolved.package ));
				( key, outcome )
			})
			.collect::<Vec<_>>();

		let mut groups = HashMap::<&str, Vec<String>>::new();
		outcomes.iter()
			.filter_map(| ( key, outcome ) | Some(( key.as_deref()?, outcome.as_ref().ok()? )))
			.for_each(| ( key, resolved ) | groups.entry( key ).or_default().push( describe( &resolved.package )));

		let groups = groups.into_iter()
			.filter(| ( _, packages ) | packages.len() > 1 )
			.map(| ( key, packages ) | ( key.to_string(), packages ))
			.collect::<HashMap<_, _>>();

		let mut reported = HashSet::new();
		let distinct = outcomes.into_iter().filter_map(| ( key, outcome ) | {
			let Some( packages ) = key.as_ref().and_then(| key | groups.get( key )) else { return Some( outcome ) };
			let key = key.unwrap_or_default();
			if let Ok( resolved ) = outcome { resolved.package.dispose(); }
			match reported.insert( key.clone() ) {
				true => {
					tracing::warn!( %key, count = packages.len(), "Rejecting ambiguous packages" );
					Some( Err( ResolutionError::DuplicateKey { key, packages: packages.clone() }))
				},
				false => None,
			}
		}).collect::<Vec<_>>();

		Box::new( distinct.into_iter() )

	}
}
