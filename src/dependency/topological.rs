use std::collections::{ BTreeMap, BTreeSet, HashSet };

use crate::manifest::{ Dependency, Manifest };
use super::{ DependencyResolver, LoadStep, ResolveResult, UnresolvableReason };



/// Layered topological sort over manifest dependencies.
///
/// Steps are built in two rounds. The strict round only places manifests whose every
/// dependency, optional ones included, is already met. Once it stalls, the relaxed round
/// also accepts optional dependencies that no pending manifest can satisfy. Should only
/// optional dependencies among pending manifests be left, the first such manifest in name
/// order gets a step of its own. Present optional dependencies therefore always load in an
/// earlier step than their dependents, except where they form a cycle.
///
/// Whatever is left is classified, repeating until nothing changes:
/// 1. required dependencies matching nothing loadable make a manifest
/// 	[`MissingDependencies`]( UnresolvableReason::MissingDependencies );
/// 2. a depth first search from each remaining manifest, in name order, along unmet required
/// 	dependencies finds [`DependencyCycle`]( UnresolvableReason::DependencyCycle )s. The first
/// 	path leading back to the start wins and all its members share it.
///
/// Because classified manifests no longer count as loadable, a manifest depending on a
/// cycle or on a manifest with missing dependencies ends up with missing dependencies of its
/// own on the next pass. Anything still left is [`Unknown`]( UnresolvableReason::Unknown ).
#[derive( Clone, Copy, Debug, Default )]
pub struct TopologicalResolver ;

impl DependencyResolver for TopologicalResolver {
	fn resolve_dependencies( &self, to_resolve: &[Manifest], already_resolved: &[Manifest] ) -> ResolveResult {

		let mut resolved = already_resolved.iter().collect::<Vec<_>>();
		let mut pending = to_resolve.iter().collect::<BTreeSet<_>>();
		let mut load_steps = Vec::new();

		for strict in [ true, false ] { loop {

			let candidates = pending.iter().copied().collect::<Vec<_>>();
			let mut step = pending.iter()
				.filter(| manifest | manifest.dependencies().iter().all(| dependency | match ( strict, dependency.is_required() ) {
					( true, _ ) | ( false, true ) => is_met( dependency, &resolved ),
					( false, false ) => is_met( dependency, &resolved ) || !is_met( dependency, &candidates ),
				}))
				.copied()
				.collect::<BTreeSet<_>>();

			// Only optional dependencies on each other remain: place the first of them alone.
			if step.is_empty() && !strict {
				step.extend( pending.iter()
					.find(| manifest | manifest.required_dependencies().all(| dependency | is_met( dependency, &resolved )))
					.copied()
				);
			}

			if step.is_empty() { break }
			step.iter().for_each(| manifest | { pending.remove( manifest ); });
			resolved.extend( step.iter().copied() );
			tracing::trace!( step = load_steps.len(), size = step.len(), strict, "Placed load step" );
			load_steps.push( LoadStep::new( step.into_iter().cloned().collect() ));

		}}

		let unresolvable = classify( pending, &resolved );
		if !unresolvable.is_empty() {
			tracing::debug!( count = unresolvable.len(), "Some manifests could not be placed in a load step" );
		}

		ResolveResult { load_steps, unresolvable }

	}
}

fn is_met( dependency: &Dependency, candidates: &[&Manifest] ) -> bool {
	candidates.iter().any(| candidate | dependency.is_satisfied_by( candidate ))
}

fn classify<'a>(
	mut remaining: BTreeSet<&'a Manifest>,
	resolved: &[&'a Manifest],
) -> BTreeMap<Manifest, UnresolvableReason> {

	let mut unresolvable = BTreeMap::new();

	loop {

		let classified_before = unresolvable.len();

		let missing = remaining.iter()
			.filter_map(| manifest | {
				let missing = manifest.required_dependencies()
					.filter(| dependency | !is_met( dependency, resolved ))
					.filter(| dependency | !remaining.iter().any(| candidate | dependency.is_satisfied_by( candidate )))
					.cloned()
					.collect::<BTreeSet<_>>();
				( !missing.is_empty() ).then_some(( *manifest, missing ))
			})
			.collect::<Vec<_>>();

		for ( manifest, dependencies ) in missing {
			remaining.remove( manifest );
			unresolvable.insert( manifest.clone(), UnresolvableReason::MissingDependencies( dependencies ));
		}

		let starts = remaining.iter().copied().collect::<Vec<_>>();
		for start in starts {
			if !remaining.contains( start ) { continue }
			let Some( cycle ) = find_cycle( start, &remaining, resolved ) else { continue };
			let members = cycle.iter().map(| manifest | ( *manifest ).clone() ).collect::<Vec<_>>();
			for member in cycle {
				remaining.remove( member );
				unresolvable.insert( member.clone(), UnresolvableReason::DependencyCycle( members.clone() ));
			}
		}

		if unresolvable.len() == classified_before { break }

	}

	unresolvable.extend( remaining.into_iter().map(| manifest | ( manifest.clone(), UnresolvableReason::Unknown )));
	unresolvable

}

fn find_cycle<'a>(
	start: &'a Manifest,
	remaining: &BTreeSet<&'a Manifest>,
	resolved: &[&'a Manifest],
) -> Option<Vec<&'a Manifest>> {

	fn visit<'a>(
		current: &'a Manifest,
		start: &'a Manifest,
		remaining: &BTreeSet<&'a Manifest>,
		resolved: &[&'a Manifest],
		path: &mut Vec<&'a Manifest>,
		explored: &mut HashSet<&'a Manifest>,
	) -> bool {

		path.push( current );
		let blockers = current.required_dependencies()
			.filter(| dependency | !is_met( dependency, resolved ))
			.flat_map(| dependency | remaining.iter().copied().filter( move | candidate | dependency.is_satisfied_by( candidate )))
			.collect::<Vec<_>>();

		for next in blockers {
			if next == start { return true }
			if path.contains( &next ) || !explored.insert( next ) { continue }
			if visit( next, start, remaining, resolved, path, explored ) { return true }
		}

		path.pop();
		false

	}

	let mut path = Vec::new();
	let mut explored = HashSet::new();
	visit( start, start, remaining, resolved, &mut path, &mut explored ).then_some( path )

}

#[cfg( test )]
mod tests {

	use super::* ;
	use crate::manifest::parse_version ;

	fn manifest( name: &str, requires: &[&str] ) -> Manifest {
		Manifest::new( name, parse_version( "1.0" ).unwrap() )
			.with_dependencies( requires.iter().map(| name | Dependency::required( *name )))
	}

	#[test]
	fn self_dependency_is_a_cycle_of_one() {
		let a = manifest( "a", &[ "a" ]);
		let result = TopologicalResolver.resolve_dependencies( &[ a.clone() ], &[] );
		assert_eq!( result.unresolvable.get( &a ), Some( &UnresolvableReason::DependencyCycle( vec![ a.clone() ])));
	}

	#[test]
	fn dependents_of_a_cycle_report_the_cycle_member_as_missing() {
		let a = manifest( "a", &[ "b" ]);
		let b = manifest( "b", &[ "a" ]);
		let c = manifest( "c", &[ "a" ]);
		let result = TopologicalResolver.resolve_dependencies( &[ c.clone(), b, a ], &[] );
		assert_eq!(
			result.unresolvable.get( &c ),
			Some( &UnresolvableReason::MissingDependencies( BTreeSet::from([ Dependency::required( "a" ) ]))),
		);
	}

	#[test]
	fn cycles_are_searched_in_name_order() {
		let a = manifest( "a", &[ "c" ]);
		let b = manifest( "b", &[ "a" ]);
		let c = manifest( "c", &[ "b" ]);
		let result = TopologicalResolver.resolve_dependencies( &[ c.clone(), b.clone(), a.clone() ], &[] );
		let expected = UnresolvableReason::DependencyCycle( vec![ a.clone(), c.clone(), b.clone() ]);
		assert_eq!( result.unresolvable.get( &b ), Some( &expected ));
	}

}
