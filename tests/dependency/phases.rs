use wasm_plugin_loader::{
	DependencyResolver, LoadPhase, MultiPhaseResolver, TopologicalResolver, UnresolvableReason,
};
use crate::fixtures::{ manifest, names };

#[test]
fn phases_load_in_order() {

	let early = manifest( "early", &[] ).with_load_phase( LoadPhase::BeforeHostReady );
	let late = manifest( "late", &[ "early" ]);

	let result = MultiPhaseResolver::by_load_phase( TopologicalResolver ).resolve_dependencies( &[ late, early ], &[] );

	assert!( result.is_fully_resolved() );
	assert_eq!( names( &result.load_steps[0] ), vec![ "early" ]);
	assert_eq!( names( &result.load_steps[1] ), vec![ "late" ]);

}

#[test]
fn independent_manifests_of_different_phases_get_separate_steps() {

	let early = manifest( "early", &[] ).with_load_phase( LoadPhase::BeforeHostReady );
	let late = manifest( "late", &[] );

	let result = MultiPhaseResolver::by_load_phase( TopologicalResolver ).resolve_dependencies( &[ late, early ], &[] );

	assert_eq!( result.load_steps.len(), 2 );
	assert_eq!( result.step_of( "early" ), Some( 0 ));
	assert_eq!( result.step_of( "late" ), Some( 1 ));

}

#[test]
fn dependency_on_a_later_phase_is_missing() {

	let early = manifest( "early", &[ "late" ]).with_load_phase( LoadPhase::BeforeHostReady );
	let late = manifest( "late", &[] );

	let result = MultiPhaseResolver::by_load_phase( TopologicalResolver ).resolve_dependencies( &[ early, late ], &[] );

	assert!( matches!( result.reason_for( "early" ), Some( UnresolvableReason::MissingDependencies( _ ))));
	assert_eq!( result.step_of( "late" ), Some( 0 ));

}

#[test]
fn unlisted_phase_is_unknown() {

	let resolver = MultiPhaseResolver::new( TopologicalResolver, | manifest: &wasm_plugin_loader::Manifest | manifest.load_phase(), [ LoadPhase::AfterHostReady ]);
	let early = manifest( "early", &[] ).with_load_phase( LoadPhase::BeforeHostReady );

	let result = resolver.resolve_dependencies( &[ early, manifest( "late", &[] )], &[] );

	assert_eq!( result.reason_for( "early" ), Some( &UnresolvableReason::Unknown ));
	assert_eq!( result.step_of( "late" ), Some( 0 ));

}
