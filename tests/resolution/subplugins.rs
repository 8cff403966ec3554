use std::sync::Arc ;
use wasm_plugin_loader::{ ArchiveResolver, ResolutionError, SubpluginResolver, TomlManifestSerializer, resolve_all };
use crate::fixtures::{ ANSWER, ENTRY, MANIFEST, archive, manifest_toml, package, resolver };

const PARENT: &str = r#"
uniqueName = "parent"
version = "1.0"
entry = "plugin.wat"
subplugins = [ "addons/extra" ]
"# ;

#[test]
fn subplugins_follow_their_parent() {

	let root = tempfile::tempdir().unwrap();
	package( root.path(), "parent", PARENT, &[
		( ENTRY, ANSWER ),
		( "addons/extra/manifest.toml", &manifest_toml( "extra", "1.0", &[ "parent" ])),
		( "addons/extra/plugin.wat", ANSWER ),
	]);
	package( root.path(), "sibling", &manifest_toml( "sibling", "1.0", &[] ), &[( ENTRY, ANSWER )]);

	let resolver = SubpluginResolver::new( resolver( root.path() ), MANIFEST, Arc::new( TomlManifestSerializer ));
	let ( packages, errors ) = resolve_all( &resolver );

	assert_no_warnings!( errors );
	let names = packages.iter().map(| resolved | resolved.package.manifest().unique_name() ).collect::<Vec<_>>();
	assert_eq!( names, vec![ "parent", "extra", "sibling" ]);

	let extra = &packages[1].package ;
	assert_ne!( extra.id(), packages[0].package.id() );
	assert_eq!( extra.read( ENTRY ).unwrap(), ANSWER.as_bytes() );
	assert!( !extra.storage().contains( "addons/extra/plugin.wat" ));

}

#[test]
fn subplugins_of_archives_share_the_archive() {

	let root = tempfile::tempdir().unwrap();
	let path = archive( root.path(), "bundle.tar.gz", &[
		( MANIFEST, PARENT ),
		( ENTRY, ANSWER ),
		( "addons/extra/manifest.toml", &manifest_toml( "extra", "1.0", &[] )),
		( "addons/extra/plugin.wat", ANSWER ),
	]);

	let serializer = Arc::new( TomlManifestSerializer );
	let resolver = SubpluginResolver::new( ArchiveResolver::new( &path, MANIFEST, serializer.clone() ), MANIFEST, serializer );
	let ( packages, errors ) = resolve_all( &resolver );

	assert_no_warnings!( errors );
	assert_eq!( packages.len(), 2 );
	assert!( packages[1].package.location().contains( "addons/extra" ));
	assert_eq!( packages[1].package.read( ENTRY ).unwrap(), ANSWER.as_bytes() );

}

#[test]
fn missing_subplugin_is_an_error_after_its_parent() {

	let root = tempfile::tempdir().unwrap();
	package( root.path(), "parent", PARENT, &[( ENTRY, ANSWER )]);

	let resolver = SubpluginResolver::new( resolver( root.path() ), MANIFEST, Arc::new( TomlManifestSerializer ));
	let outcomes = wasm_plugin_loader::PackageResolver::resolve_packages( &resolver ).collect::<Vec<_>>();

	assert_eq!( outcomes.len(), 2 );
	assert!( outcomes[0].is_ok() );
	assert!( matches!( outcomes[1], Err( ResolutionError::MissingManifest { .. } | ResolutionError::UnreadableSource { .. })));

}
