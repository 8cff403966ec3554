use std::collections::HashMap ;

use crate::package::PluginPackage ;
use super::{ PackageResolver, PackageStream, describe };



/// Among packages sharing a key, keeps only those with the highest priority.
///
/// The key function returns a `( key, priority )` pair for each package. Dropped packages are
/// named in a warning attached to every survivor of their group. When several packages
/// tie for the highest priority they are all kept, leaving the ambiguity to a later stage
/// such as a [`DistinctResolver`]( super::DistinctResolver ).
///
/// Needs to see the whole inner stream before producing anything.
pub struct PrioritizingResolver<R, K> {
	inner: R,
	key: K,
}

impl<R, K> PrioritizingResolver<R, K>
where
	R: PackageResolver,
	K: Fn( &PluginPackage ) -> ( String, i64 ),
{
	pub fn new( inner: R, key: K ) -> Self { Self { inner, key }}
}

impl<R, K> PackageResolver for PrioritizingResolver<R, K>
where
	R: PackageResolver,
	K: Fn( &PluginPackage ) -> ( String, i64 ),
{
	fn resolve_packages( &self ) -> PackageStream<'_> {

		let outcomes = self.inner.resolve_packages()
			.map(| outcome | {
				let key = outcome.as_ref().ok().map(| resolved | ( self.key )( &resolved.package ));
				( key, outcome )
			})
			.collect::<Vec<_>>();

		let mut best = HashMap::<&str, i64>::new();
		outcomes.iter()
			.filter_map(| ( key, _ ) | key.as_ref() )
			.for_each(| ( key, priority ) | {
				let entry = best.entry( key.as_str() ).or_insert( *priority );
				*entry = ( *entry ).max( *priority );
			});

		let mut dropped = HashMap::<String, Vec<String>>::new();
		outcomes.iter()
			.filter_map(| ( key, outcome ) | Some(( key.as_ref()?, outcome.as_ref().ok()? )))
			.filter(| ( ( key, priority ), _ ) | best.get( key.as_str() ).is_some_and(| max | priority < max ))
			.for_each(| ( ( key, priority ), resolved ) | dropped.entry( key.clone() ).or_default()
				.push( format!( "{} [priority {}]", describe( &resolved.package ), priority )));
		let best = best.into_iter().map(| ( key, priority ) | ( key.to_string(), priority )).collect::<HashMap<_, _>>();

		let kept = outcomes.into_iter().filter_map(| ( key, outcome ) | {
			let Some(( key, priority )) = key else { return Some( outcome ) };
			let mut resolved = match outcome {
				Ok( resolved ) => resolved,
				Err( err ) => return Some( Err( err )),
			};
			match best.get( &key ).is_some_and(| max | priority < *max ) {
				true => {
					tracing::debug!( package = %describe( &resolved.package ), %key, priority, "Dropping lower priority package" );
					resolved.package.dispose();
					None
				},
				false => {
					if let Some( losers ) = dropped.get( &key ) {
						resolved.warnings.push( format!( "Preferred over lower priority packages for '{}': {}", key, losers.join( ", " )));
					}
					Some( Ok( resolved ))
				}
			}
		}).collect::<Vec<_>>();

		Box::new( kept.into_iter() )

	}
}
