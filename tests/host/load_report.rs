use wasm_plugin_loader::{
	ComponentLoader, DefaultContext, Engine, Linker, LoadError, NarrowingLoader, PackageState,
	PluginHost, PluginPackage, PrioritizingResolver, ResolutionError, TopologicalResolver,
	UnresolvableReason, Val,
};
use crate::fixtures::{ self, ANSWER, ENTRY, NAMED, NO_EXTENSION, manifest, manifest_toml, package, plugin, resolver };

#[test]
fn dependencies_load_first() {

	let root = tempfile::tempdir().unwrap();
	plugin( root.path(), "a", &[ "b" ], ANSWER );
	plugin( root.path(), "b", &[], ANSWER );
	let engine = Engine::default();

	let report = fixtures::host( &engine ).load_all( &resolver( root.path() ), &[] );

	assert_clean!( report );
	assert_eq!( report.state_of( "b" ), Some( PackageState::Loaded { step: 0 }));
	assert_eq!( report.state_of( "a" ), Some( PackageState::Loaded { step: 1 }));
	assert_eq!( report.load_steps.len(), 2 );
	assert_eq!( report.loaded.iter().map(| loaded | loaded.package.manifest().unique_name() ).collect::<Vec<_>>(), vec![ "b", "a" ]);
	assert!( matches!( report.plugin( "a" ).unwrap().call( "answer", &[] ).unwrap()[..], [ Val::U32( 42 )]));

}

#[test]
fn every_package_ends_in_exactly_one_state() {

	let root = tempfile::tempdir().unwrap();
	plugin( root.path(), "fine", &[], ANSWER );
	plugin( root.path(), "cycle-a", &[ "cycle-b" ], ANSWER );
	plugin( root.path(), "cycle-b", &[ "cycle-a" ], ANSWER );
	plugin( root.path(), "lonely", &[ "absent" ], ANSWER );
	plugin( root.path(), "hollow", &[], NO_EXTENSION );
	package( root.path(), "twin-1", &manifest_toml( "twin", "1.0", &[] ), &[( ENTRY, ANSWER )]);
	package( root.path(), "twin-2", &manifest_toml( "twin", "1.0", &[] ), &[( ENTRY, ANSWER )]);
	package( root.path(), "optional", "uniqueName = \"optional\"\nversion = \"1.0\"\nentry = \"plugin.wat\"\n\n[[dependencies]]\nuniqueName = \"nowhere\"\nrequired = false\n", &[( ENTRY, ANSWER )]);
	let engine = Engine::default();

	let report = fixtures::host( &engine ).load_all( &resolver( root.path() ), &[] );

	assert_eq!( report.state_of( "fine" ), Some( PackageState::Loaded { step: 0 }));
	assert!( matches!( report.state_of( "optional" ), Some( PackageState::Loaded { .. })));
	assert_eq!( report.state_of( "cycle-a" ), Some( PackageState::Unresolvable ));
	assert_eq!( report.state_of( "lonely" ), Some( PackageState::Unresolvable ));
	assert_eq!( report.state_of( "hollow" ), Some( PackageState::LoadFailed ));
	assert_eq!( report.state_of( "twin" ), Some( PackageState::DuplicateRejected ));
	assert_eq!( report.state_of( "never-seen" ), None );

	assert!( matches!( report.unresolvable.iter().find(| ( manifest, _ ) | manifest.unique_name() == "cycle-b" ), Some(( _, UnresolvableReason::DependencyCycle( _ )))));
	assert!( matches!( report.rejected.as_slice(), [ ResolutionError::DuplicateKey { .. }]));
	assert!( matches!( report.failed[0].error, LoadError::NoExtension { .. }));
	assert!( !report.is_clean() );

}

#[test]
fn dependents_of_a_failed_package_are_skipped() {

	let root = tempfile::tempdir().unwrap();
	plugin( root.path(), "base", &[], NO_EXTENSION );
	plugin( root.path(), "addon", &[ "base" ], ANSWER );
	let engine = Engine::default();

	let report = fixtures::host( &engine ).load_all( &resolver( root.path() ), &[] );

	assert!( report.loaded.is_empty() );
	assert_eq!( report.failed.len(), 2 );
	let addon = report.failed.iter().find(| failed | failed.manifest.unique_name() == "addon" ).unwrap();
	match &addon.error {
		LoadError::DependencyFailed { dependency, .. } => assert_eq!( dependency, "base" ),
		error => panic!( "Expected DependencyFailed, found: {}", error ),
	}

}

#[test]
fn already_resolved_manifests_count_as_loaded() {

	let root = tempfile::tempdir().unwrap();
	plugin( root.path(), "addon", &[ "host.api" ], ANSWER );
	let engine = Engine::default();

	let report = fixtures::host( &engine ).load_all( &resolver( root.path() ), &[ manifest( "host.api", &[] )]);

	assert_clean!( report );
	assert_eq!( report.state_of( "addon" ), Some( PackageState::Loaded { step: 0 }));

}

#[test]
fn resolution_warnings_reach_the_loaded_plugin() {

	let root = tempfile::tempdir().unwrap();
	package( root.path(), "tool.1", &manifest_toml( "tool", "1.0", &[] ), &[( ENTRY, ANSWER )]);
	package( root.path(), "tool.2", &manifest_toml( "tool", "2.0", &[] ), &[( ENTRY, NAMED )]);
	let engine = Engine::default();

	let prioritized = PrioritizingResolver::new( resolver( root.path() ), | package: &PluginPackage | {
		let priority = match package.location().ends_with( ".2" ) { true => 2, false => 1 };
		( package.manifest().unique_name().to_string(), priority )
	});
	let report = fixtures::host( &engine ).load_all( &prioritized, &[] );

	assert_clean!( report );
	let tool = &report.loaded[0] ;
	assert_eq!( tool.package.manifest().version().major, 2 );
	assert_eq!( tool.warnings.len(), 1 );
	assert!( tool.warnings[0].contains( "tool.1" ));
	assert_eq!( tool.plugin.constructor(), "new" );

}

#[test]
fn host_works_with_a_plain_topological_resolver() {

	let root = tempfile::tempdir().unwrap();
	plugin( root.path(), "solo", &[], ANSWER );
	let engine = Engine::default();

	let loader = NarrowingLoader::components( ComponentLoader::<DefaultContext>::new( &engine, Linker::new( &engine )));
	let host = PluginHost::new( loader, TopologicalResolver );
	let report = host.load_all( &resolver( root.path() ), &[] );

	assert_clean!( report );
	assert_eq!( report.loaded.len(), 1 );
	assert_no_warnings!( report.loaded[0].warnings );

}
