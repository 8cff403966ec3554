use std::path::Path ;
use wasm_plugin_loader::{
	DistinctResolver, PackageResolver, PluginPackage, PrioritizingResolver, ResolutionError,
	RewritingResolver, ValidatingResolver, resolve_all,
};
use crate::fixtures::{ ANSWER, ENTRY, MANIFEST, manifest_toml, package, plugin, resolver };

/// Priority encoded in the package directory name: `name.priority`.
fn priority_key( package: &PluginPackage ) -> ( String, i64 ) {
	let location = package.location();
	let priority = Path::new( &location ).extension()
		.and_then(| extension | extension.to_str()?.parse().ok() )
		.unwrap_or( 0 );
	( package.manifest().unique_name().to_string(), priority )
}

#[test]
fn validation_failure_replaces_the_package() {

	let root = tempfile::tempdir().unwrap();
	plugin( root.path(), "allowed", &[], ANSWER );
	plugin( root.path(), "forbidden", &[], ANSWER );

	let resolver = ValidatingResolver::new( resolver( root.path() ), | package: &PluginPackage | {
		match package.manifest().unique_name() {
			"forbidden" => Err( "blocked by policy".to_string() ),
			_ => Ok(()),
		}
	});
	let outcomes = resolver.resolve_packages().collect::<Vec<_>>();

	assert_eq!( outcomes.len(), 2 );
	assert!( outcomes[0].is_ok() );
	match &outcomes[1] {
		Err( ResolutionError::Validation { message, .. }) => assert_eq!( message, "blocked by policy" ),
		outcome => panic!( "Expected a validation error, found: {:?}", outcome ),
	}

}

#[test]
fn duplicate_names_are_all_rejected() {

	let root = tempfile::tempdir().unwrap();
	package( root.path(), "first", &manifest_toml( "twin", "1.0", &[] ), &[( ENTRY, ANSWER )]);
	plugin( root.path(), "middle", &[], ANSWER );
	package( root.path(), "second", &manifest_toml( "twin", "2.0", &[] ), &[( ENTRY, ANSWER )]);

	let outcomes = DistinctResolver::by_unique_name( resolver( root.path() )).resolve_packages().collect::<Vec<_>>();

	assert_eq!( outcomes.len(), 2 );
	match &outcomes[0] {
		Err( ResolutionError::DuplicateKey { key, packages }) => {
			assert_eq!( key, "twin" );
			assert_eq!( packages.len(), 2 );
			assert!( packages[0].contains( "first" ));
			assert!( packages[1].contains( "second" ));
		},
		outcome => panic!( "Expected a duplicate key error, found: {:?}", outcome ),
	}
	assert_eq!( outcomes[1].as_ref().unwrap().package.manifest().unique_name(), "middle" );

}

#[test]
fn highest_priority_wins_with_a_warning() {

	let root = tempfile::tempdir().unwrap();
	package( root.path(), "tool.1", &manifest_toml( "tool", "1.0", &[] ), &[( ENTRY, ANSWER )]);
	package( root.path(), "tool.2", &manifest_toml( "tool", "1.1", &[] ), &[( ENTRY, ANSWER )]);
	plugin( root.path(), "other", &[], ANSWER );

	let ( packages, errors ) = resolve_all( &PrioritizingResolver::new( resolver( root.path() ), priority_key ));

	assert_no_warnings!( errors );
	assert_eq!( packages.len(), 2 );
	let tool = packages.iter().find(| resolved | resolved.package.manifest().unique_name() == "tool" ).unwrap();
	assert_eq!( tool.package.manifest().version().to_string(), "1.1.0" );
	assert_eq!( tool.warnings.len(), 1 );
	assert!( tool.warnings[0].contains( "tool.1" ), "Warning does not name the dropped package: {}", tool.warnings[0] );

	let other = packages.iter().find(| resolved | resolved.package.manifest().unique_name() == "other" ).unwrap();
	assert_no_warnings!( other.warnings );

}

#[test]
fn priority_ties_are_left_for_deduplication() {

	let root = tempfile::tempdir().unwrap();
	package( root.path(), "tool.3", &manifest_toml( "tool", "1.0", &[] ), &[]);
	package( root.path(), "tool.x3", &manifest_toml( "tool", "1.1", &[] ), &[]);

	let prioritized = PrioritizingResolver::new( resolver( root.path() ), | package: &PluginPackage | ( package.manifest().unique_name().to_string(), 3 ));
	let ( packages, _ ) = resolve_all( &prioritized );
	assert_eq!( packages.len(), 2 );

	let outcomes = DistinctResolver::by_unique_name( prioritized ).resolve_packages().collect::<Vec<_>>();
	assert!( matches!( outcomes.as_slice(), [ Err( ResolutionError::DuplicateKey { .. })]));

}

#[test]
fn case_insensitive_rewrite_keeps_the_manifest() {

	let root = tempfile::tempdir().unwrap();
	package( root.path(), "shouty", &manifest_toml( "shouty", "1.0", &[] ), &[( "PLUGIN.WAT", ANSWER )]);

	let ( packages, errors ) = resolve_all( &RewritingResolver::case_insensitive( resolver( root.path() )));

	assert_no_warnings!( errors );
	assert_eq!( packages[0].package.manifest().unique_name(), "shouty" );
	assert_eq!( packages[0].package.read( ENTRY ).unwrap(), ANSWER.as_bytes() );

}

#[test]
fn staged_packages_are_served_from_the_copy() {

	let root = tempfile::tempdir().unwrap();
	let staging = tempfile::tempdir().unwrap();
	let original = plugin( root.path(), "staged", &[], ANSWER );

	let ( packages, errors ) = resolve_all( &RewritingResolver::staged( resolver( root.path() ), staging.path() ));
	assert_no_warnings!( errors );

	std::fs::remove_dir_all( original ).unwrap();
	let package = &packages[0].package ;
	assert!( package.location().starts_with( &staging.path().display().to_string() ));
	assert_eq!( package.read( ENTRY ).unwrap(), ANSWER.as_bytes() );
	assert!( package.storage().contains( MANIFEST ));

}

#[test]
fn staging_stays_inside_the_staging_directory() {

	let root = tempfile::tempdir().unwrap();
	let outside = root.path().join( "outside" );
	let staging = root.path().join( "staging" );
	let escaping = format!( "{}", outside.display() ).replace( '\\', "/" );
	package( root.path(), "absolute", &manifest_toml( &escaping, "1.0", &[] ), &[( ENTRY, ANSWER )]);
	package( root.path(), "relative", &manifest_toml( "../../climbing", "1.0", &[] ), &[( ENTRY, ANSWER )]);

	let ( packages, errors ) = resolve_all( &RewritingResolver::staged( resolver( root.path() ), &staging ));
	assert_no_warnings!( errors );

	assert_eq!( packages.len(), 2 );
	for resolved in &packages {
		let location = std::path::PathBuf::from( resolved.package.location() );
		assert_eq!( location.parent(), Some( staging.as_path() ));
	}
	assert!( !outside.exists() );

}
