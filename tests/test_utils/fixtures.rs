#[allow( dead_code )]
mod fixtures {

	use std::path::{ Path, PathBuf };
	use std::sync::Arc ;
	use wasm_plugin_loader::{
		ComponentLoader, DefaultContext, Dependency, DependencyResolver, Engine, ExtensionInstance,
		DirectoryResolver, Linker, Manifest, MultiPhaseResolver, NarrowingLoader, PackageResolver,
		PluginHost, PluginLoader, PluginPackage, RecursiveResolver, TomlManifestSerializer, TopologicalResolver, parse_version,
	};

	pub const MANIFEST: &str = "manifest.toml" ;
	pub const ENTRY: &str = "plugin.wat" ;

	/// Exports `acme:test/extension` with `answer: func() -> u32` returning 42.
	pub const ANSWER: &str = r#"(component
		(core module $m
			(func (export "answer") (result i32) i32.const 42)
		)
		(core instance $i (instantiate $m))
		(func $answer (result u32) (canon lift (core func $i "answer")))
		(instance $extension (export "answer" (func $answer)))
		(export "acme:test/extension" (instance $extension))
	)"# ;

	/// Two constructors: `new( plugin-name: string )` keeps the length of the name as state,
	/// `new-default()` keeps 0. `name-length` returns the state.
	pub const NAMED: &str = r#"(component
		(core module $m
			(memory (export "memory") 1)
			(global $next (mut i32) (i32.const 1024))
			(func (export "realloc") (param i32 i32 i32 i32) (result i32)
				(local $ptr i32)
				(local.set $ptr (global.get $next))
				(global.set $next (i32.add (global.get $next) (local.get 3)))
				(local.get $ptr))
			(func (export "new") (param i32 i32) (result i32) (local.get 1))
			(func (export "new-default") (result i32) (i32.const 0))
			(func (export "name-length") (param i32) (result i32) (local.get 0))
		)
		(core instance $i (instantiate $m))
		(func $new (param "plugin-name" string) (result u32)
			(canon lift (core func $i "new") (memory (core memory $i "memory")) (realloc (core func $i "realloc"))))
		(func $new-default (result u32) (canon lift (core func $i "new-default")))
		(func $name-length (param "state" u32) (result u32) (canon lift (core func $i "name-length")))
		(instance $extension
			(export "new" (func $new))
			(export "new-default" (func $new-default))
			(export "name-length" (func $name-length))
		)
		(export "acme:named/extension@1.0.0" (instance $extension))
	)"# ;

	/// Only constructor takes a `database: u32` nothing provides by default.
	pub const NEEDS_DATABASE: &str = r#"(component
		(core module $m
			(func (export "new") (param i32) (result i32) (local.get 0))
		)
		(core instance $i (instantiate $m))
		(func $new (param "database" u32) (result u32) (canon lift (core func $i "new")))
		(instance $extension (export "new" (func $new)))
		(export "acme:db/extension" (instance $extension))
	)"# ;

	pub const AMBIGUOUS: &str = r#"(component
		(core module $m
			(func (export "answer") (result i32) i32.const 1)
		)
		(core instance $i (instantiate $m))
		(func $answer (result u32) (canon lift (core func $i "answer")))
		(instance $one (export "answer" (func $answer)))
		(instance $two (export "answer" (func $answer)))
		(export "acme:one/extension" (instance $one))
		(export "acme:two/extension" (instance $two))
	)"# ;

	pub const NO_EXTENSION: &str = r#"(component
		(core module $m
			(func (export "answer") (result i32) i32.const 1)
		)
		(core instance $i (instantiate $m))
		(func $answer (result u32) (canon lift (core func $i "answer")))
		(instance $service (export "answer" (func $answer)))
		(export "acme:test/service" (instance $service))
	)"# ;

	/// `boom` traps when called.
	pub const TRAPPING: &str = r#"(component
		(core module $m
			(func (export "answer") (result i32) i32.const 42)
			(func (export "boom") unreachable)
		)
		(core instance $i (instantiate $m))
		(func $answer (result u32) (canon lift (core func $i "answer")))
		(func $boom (canon lift (core func $i "boom")))
		(instance $extension
			(export "answer" (func $answer))
			(export "boom" (func $boom))
		)
		(export "acme:test/extension" (instance $extension))
	)"# ;

	/// The constructor traps.
	pub const FAILING_CONSTRUCTOR: &str = r#"(component
		(core module $m
			(func (export "new") (result i32) unreachable)
		)
		(core instance $i (instantiate $m))
		(func $new (result u32) (canon lift (core func $i "new")))
		(instance $extension (export "new" (func $new)))
		(export "acme:test/extension" (instance $extension))
	)"# ;

	/// TOML manifest with a `plugin.wat` entry and required dependencies.
	pub fn manifest_toml( name: &str, version: &str, requires: &[&str] ) -> String {
		let mut manifest = format!( "uniqueName = \"{}\"\nversion = \"{}\"\nentry = \"{}\"\n", name, version, ENTRY );
		for dependency in requires {
			manifest.push_str( &format!( "\n[[dependencies]]\nuniqueName = \"{}\"\n", dependency ));
		}
		manifest
	}

	/// Writes a package directory `dir` under `root` holding `manifest` and `files`.
	pub fn package( root: &Path, dir: &str, manifest: &str, files: &[( &str, &str )]) -> PathBuf {
		let path = root.join( dir );
		std::fs::create_dir_all( &path ).unwrap();
		std::fs::write( path.join( MANIFEST ), manifest ).unwrap();
		for ( name, content ) in files {
			let file = path.join( name );
			if let Some( parent ) = file.parent() { std::fs::create_dir_all( parent ).unwrap(); }
			std::fs::write( file, content ).unwrap();
		}
		path
	}

	/// Writes a component package called `name` in a directory of the same name.
	pub fn plugin( root: &Path, name: &str, requires: &[&str], component: &str ) -> PathBuf {
		package( root, name, &manifest_toml( name, "1.0", requires ), &[( ENTRY, component )])
	}

	/// Writes a gzip compressed package archive.
	pub fn archive( root: &Path, file_name: &str, files: &[( &str, &str )]) -> PathBuf {
		let path = root.join( file_name );
		let encoder = flate2::write::GzEncoder::new( std::fs::File::create( &path ).unwrap(), flate2::Compression::default() );
		let mut builder = tar::Builder::new( encoder );
		for ( name, content ) in files {
			let mut header = tar::Header::new_gnu();
			header.set_size( content.len() as u64 );
			header.set_mode( 0o644 );
			header.set_cksum();
			builder.append_data( &mut header, name, content.as_bytes() ).unwrap();
		}
		builder.into_inner().unwrap().finish().unwrap();
		path
	}

	pub fn resolver( root: &Path ) -> RecursiveResolver {
		RecursiveResolver::new( root, MANIFEST, Arc::new( TomlManifestSerializer ))
	}

	/// Reads the package rooted at `path`.
	pub fn read_package( path: &Path ) -> PluginPackage {
		let resolver = DirectoryResolver::new( path, MANIFEST, Arc::new( TomlManifestSerializer ));
		let first = resolver.resolve_packages().next();
		match first {
			Some( Ok( resolved )) => resolved.package,
			outcome => panic!( "Failed to read package at {}: {:?}", path.display(), outcome ),
		}
	}

	pub fn host( engine: &Engine ) -> PluginHost<
		impl PluginLoader<Manifest, Plugin = ExtensionInstance<DefaultContext>>,
		impl DependencyResolver,
	> {
		let loader = NarrowingLoader::components( ComponentLoader::<DefaultContext>::new( engine, Linker::new( engine )));
		PluginHost::new( loader, MultiPhaseResolver::by_load_phase( TopologicalResolver ))
	}

	pub fn manifest( name: &str, requires: &[&str] ) -> Manifest {
		Manifest::new( name, parse_version( "1.0" ).unwrap() )
			.with_dependencies( requires.iter().map(| dependency | Dependency::required( *dependency )))
	}

	pub fn names<'a>( manifests: impl IntoIterator<Item = &'a Manifest> ) -> Vec<&'a str> {
		manifests.into_iter().map( Manifest::unique_name ).collect()
	}

}
