use wasm_plugin_loader::{
	ComponentLoader, DefaultContext, Engine, InjectionRequest, InjectorChain, InjectorRegistry,
	Linker, LoadError, NarrowingLoader, PluginLoader, Val,
};
use crate::fixtures::{ FAILING_CONSTRUCTOR, NAMED, NEEDS_DATABASE, plugin, read_package };

fn component_loader( engine: &Engine ) -> ComponentLoader<DefaultContext> {
	ComponentLoader::new( engine, Linker::new( engine ))
}

#[test]
fn widest_injectable_constructor_is_chosen() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "acme.named", &[], NAMED ));
	let engine = Engine::default();

	let extension = NarrowingLoader::components( component_loader( &engine )).load( &package ).unwrap().plugin ;

	assert_eq!( extension.export(), "acme:named/extension@1.0.0" );
	assert_eq!( extension.constructor(), "new" );
	assert!( matches!( extension.state(), [ Val::U32( 10 )]));
	assert!( matches!( extension.call_method( "name-length", &[] ).unwrap()[..], [ Val::U32( 10 )]));

}

#[test]
fn narrower_constructor_is_used_when_a_parameter_has_no_provider() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "acme.named", &[], NAMED ));
	let engine = Engine::default();
	let loader = component_loader( &engine ).with_injectors( InjectorChain::new() );

	let extension = NarrowingLoader::components( loader ).load( &package ).unwrap().plugin ;

	assert_eq!( extension.constructor(), "new-default" );
	assert!( matches!( extension.state(), [ Val::U32( 0 )]));

}

#[test]
fn unsatisfiable_constructor_names_the_parameter() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "acme.db", &[], NEEDS_DATABASE ));
	let engine = Engine::default();

	match NarrowingLoader::components( component_loader( &engine )).load( &package ) {
		Err( LoadError::NoInjectableConstructor { constructor, parameter, type_name, .. }) => {
			assert_eq!( constructor, "new" );
			assert_eq!( parameter, "database" );
			assert_eq!( type_name, "u32" );
		},
		result => panic!( "Expected NoInjectableConstructor, found: {:?}", result.map(| success | success.warnings )),
	}

}

#[test]
fn registered_capability_supplies_the_parameter() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "acme.db", &[], NEEDS_DATABASE ));
	let engine = Engine::default();
	let registry = InjectorRegistry::new().with_capability( "database", | request: &InjectionRequest<'_> | match request.type_name {
		"u32" => Some( Val::U32( 7 )),
		_ => None,
	});

	let extension = NarrowingLoader::components( component_loader( &engine ).with_injector( registry )).load( &package ).unwrap().plugin ;
	assert!( matches!( extension.state(), [ Val::U32( 7 )]));

}

#[test]
fn earlier_injectors_take_precedence() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "acme.db", &[], NEEDS_DATABASE ));
	let engine = Engine::default();
	let loader = component_loader( &engine )
		.with_injector( InjectorRegistry::new().with_capability( "database", |_: &InjectionRequest<'_> | Some( Val::U32( 1 ))))
		.with_injector(| request: &InjectionRequest<'_> | ( request.parameter == "database" ).then_some( Val::U32( 2 )));

	let extension = NarrowingLoader::components( loader ).load( &package ).unwrap().plugin ;
	assert!( matches!( extension.state(), [ Val::U32( 2 )]));

}

#[test]
fn trapping_constructor_is_a_construction_error() {

	let root = tempfile::tempdir().unwrap();
	let package = read_package( &plugin( root.path(), "acme.broken", &[], FAILING_CONSTRUCTOR ));
	let engine = Engine::default();

	match NarrowingLoader::components( component_loader( &engine )).load( &package ) {
		Err( LoadError::Construction { constructor, .. }) => assert_eq!( constructor, "new" ),
		result => panic!( "Expected Construction, found: {:?}", result.map(| success | success.warnings )),
	}

}
