//! Supplying constructor arguments.
//!
//! An extension constructor may declare parameters. Each parameter is offered to an
//! [`InjectorChain`]; the first [`ParameterInjector`] able to supply a value for it wins. A
//! constructor can only be used if every one of its parameters is supplied, and among those
//! the one taking the most parameters is chosen.
//!
//! The stock injector is the [`InjectorRegistry`], which maps capability names (matched
//! against parameter names) to provider functions.

use std::collections::BTreeMap ;
use thiserror::Error ;
use wasmtime::component::Val ;

use crate::manifest::Manifest ;



/// A parameter that needs a value.
#[derive( Clone, Copy, Debug )]
pub struct InjectionRequest<'a> {
	/// Manifest of the package being loaded.
	pub manifest: &'a Manifest,
	pub constructor: &'a str,
	pub parameter: &'a str,
	/// WIT name of the parameter type, e.g. `string` or `u32`.
	pub type_name: &'a str,
}

/// Source of constructor arguments.
pub trait ParameterInjector: Send + Sync {
	/// A value for the requested parameter, or `None` to let the next injector try.
	fn inject( &self, request: &InjectionRequest<'_> ) -> Option<Val> ;
}

impl<F> ParameterInjector for F
where
	F: Fn( &InjectionRequest<'_> ) -> Option<Val> + Send + Sync,
{
	fn inject( &self, request: &InjectionRequest<'_> ) -> Option<Val> { self( request )}
}

type Provider = Box<dyn Fn( &InjectionRequest<'_> ) -> Option<Val> + Send + Sync> ;

/// Capability name to provider map.
///
/// A provider is only asked for parameters named exactly like the capability it was
/// registered under; it may still decline, typically when the parameter type does not
/// match what it provides.
///
/// # Example
///
/// ```
/// use wasm_plugin_loader::{ InjectorRegistry, Val };
///
/// let registry = InjectorRegistry::new()
/// 	.with_package_metadata()
/// 	.with_capability( "api-level", | request | match request.type_name {
/// 		"u32" => Some( Val::U32( 3 )),
/// 		_ => None,
/// 	});
/// assert!( registry.provides( "plugin-name" ));
/// assert!( registry.provides( "api-level" ));
/// ```
#[derive( Default )]
pub struct InjectorRegistry {
	providers: BTreeMap<String, Provider>,
}

impl InjectorRegistry {

	pub const PLUGIN_NAME: &'static str = "plugin-name" ;
	pub const PLUGIN_VERSION: &'static str = "plugin-version" ;

	pub fn new() -> Self { Self::default() }

	/// Registers `provider` for parameters called `capability`, replacing any previous one.
	pub fn with_capability(
		mut self,
		capability: impl Into<String>,
		provider: impl Fn( &InjectionRequest<'_> ) -> Option<Val> + Send + Sync + 'static,
	) -> Self {
		self.providers.insert( capability.into(), Box::new( provider ));
		self
	}

	/// Registers `plugin-name` and `plugin-version`, both supplied as strings taken from the
	/// manifest of the package being loaded.
	pub fn with_package_metadata( self ) -> Self {
		self
			.with_capability( Self::PLUGIN_NAME, | request | ( request.type_name == "string" )
				.then(|| Val::String( request.manifest.unique_name().to_string() )))
			.with_capability( Self::PLUGIN_VERSION, | request | ( request.type_name == "string" )
				.then(|| Val::String( request.manifest.version().to_string() )))
	}

	pub fn provides( &self, capability: &str ) -> bool { self.providers.contains_key( capability )}

	pub fn capabilities( &self ) -> impl Iterator<Item = &str> { self.providers.keys().map( String::as_str )}

}

impl ParameterInjector for InjectorRegistry {
	fn inject( &self, request: &InjectionRequest<'_> ) -> Option<Val> {
		let provider = self.providers.get( request.parameter )?;
		provider( request )
	}
}

impl std::fmt::Debug for InjectorRegistry {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_set().entries( self.providers.keys() ).finish()
	}
}

/// Ordered list of injectors; the first to supply a value wins.
#[derive( Default )]
pub struct InjectorChain {
	injectors: Vec<Box<dyn ParameterInjector>>,
}

impl InjectorChain {

	pub fn new() -> Self { Self::default() }

	pub fn with( mut self, injector: impl ParameterInjector + 'static ) -> Self {
		self.push( injector );
		self
	}

	pub fn push( &mut self, injector: impl ParameterInjector + 'static ) {
		self.injectors.push( Box::new( injector ));
	}

	#[inline] pub fn len( &self ) -> usize { self.injectors.len() }
	#[inline] pub fn is_empty( &self ) -> bool { self.injectors.is_empty() }

}

impl ParameterInjector for InjectorChain {
	fn inject( &self, request: &InjectionRequest<'_> ) -> Option<Val> {
		self.injectors.iter().find_map(| injector | injector.inject( request ))
	}
}

/// A parameter of a constructor.
#[derive( Clone, Debug, PartialEq, Eq )]
pub struct ParameterSignature {
	pub name: String,
	pub type_name: String,
}

impl ParameterSignature {
	pub fn new( name: impl Into<String>, type_name: impl Into<String> ) -> Self {
		Self { name: name.into(), type_name: type_name.into() }
	}
}

/// A constructor exported by an extension interface.
#[derive( Clone, Debug, PartialEq, Eq )]
pub struct ConstructorSignature {
	pub name: String,
	pub params: Vec<ParameterSignature>,
}

impl ConstructorSignature {
	pub fn new( name: impl Into<String>, params: impl IntoIterator<Item = ParameterSignature> ) -> Self {
		Self { name: name.into(), params: params.into_iter().collect() }
	}
}

/// The constructor to call and its arguments.
#[derive( Clone, Debug )]
pub struct SelectedConstructor {
	pub name: String,
	pub args: Vec<Val>,
}

/// No constructor could be fully injected.
///
/// Names the first parameter without a value of the closest candidate: the one with the
/// fewest such parameters, then the one with the most parameters overall.
#[derive( Clone, Debug, PartialEq, Eq, Error )]
#[error( "Parameter '{parameter}' ({type_name}) of constructor '{constructor}' cannot be injected" )]
pub struct InjectionFailure {
	pub constructor: String,
	pub parameter: String,
	pub type_name: String,
}

/// Picks the constructor to call.
///
/// Of the constructors whose every parameter is supplied by `injector`, the one with the
/// most parameters is chosen; on ties the first declared wins.
///
/// # Errors
/// Returns the closest failing candidate if no constructor can be fully injected.
///
/// # Panics
/// Panics if `constructors` is empty.
pub fn select_constructor(
	constructors: &[ConstructorSignature],
	injector: &dyn ParameterInjector,
	manifest: &Manifest,
) -> Result<SelectedConstructor, InjectionFailure> {

	assert!( !constructors.is_empty(), "At least one constructor is required" );

	let attempts = constructors.iter()
		.map(| constructor | {
			let args = constructor.params.iter()
				.map(| param | injector.inject( &InjectionRequest {
					manifest,
					constructor: &constructor.name,
					parameter: &param.name,
					type_name: &param.type_name,
				}))
				.collect::<Vec<_>>();
			( constructor, args )
		})
		.collect::<Vec<_>>();

	let mut best: Option<( &ConstructorSignature, Vec<Val> )> = None ;
	for ( constructor, args ) in &attempts {
		let Some( args ) = args.iter().cloned().collect::<Option<Vec<_>>>() else { continue };
		if best.as_ref().is_none_or(| ( chosen, _ ) | constructor.params.len() > chosen.params.len() ) {
			best = Some(( *constructor, args ));
		}
	}
	if let Some(( constructor, args )) = best {
		return Ok( SelectedConstructor { name: constructor.name.clone(), args })
	}

	let mut closest: Option<( usize, &ConstructorSignature, &[Option<Val>] )> = None ;
	for ( constructor, args ) in &attempts {
		let missing = args.iter().filter(| arg | arg.is_none() ).count();
		let closer = closest.as_ref().is_none_or(| ( chosen_missing, chosen, _ ) |
			missing < *chosen_missing
				|| ( missing == *chosen_missing && constructor.params.len() > chosen.params.len() )
		);
		if closer { closest = Some(( missing, *constructor, args.as_slice() )); }
	}

	let failure = closest.and_then(| ( _, constructor, args ) | {
		let index = args.iter().position( Option::is_none )?;
		let param = &constructor.params[index];
		Some( InjectionFailure { constructor: constructor.name.clone(), parameter: param.name.clone(), type_name: param.type_name.clone() })
	});

	// Every attempt failed, so the closest one has a missing parameter.
	Err( failure.unwrap_or_else(|| InjectionFailure {
		constructor: constructors[0].name.clone(),
		parameter: String::new(),
		type_name: String::new(),
	}))

}

#[cfg( test )]
mod tests {

	use super::* ;
	use crate::manifest::parse_version ;

	fn manifest() -> Manifest { Manifest::new( "demo", parse_version( "2.1" ).unwrap() )}

	fn registry() -> InjectorRegistry { InjectorRegistry::new().with_package_metadata() }

	#[test]
	fn widest_fully_injectable_constructor_wins() {
		let constructors = [
			ConstructorSignature::new( "new", []),
			ConstructorSignature::new( "new-named", [ ParameterSignature::new( "plugin-name", "string" )]),
			ConstructorSignature::new( "new-full", [
				ParameterSignature::new( "plugin-name", "string" ),
				ParameterSignature::new( "database", "string" ),
			]),
		];
		let selected = select_constructor( &constructors, &registry(), &manifest() ).unwrap();
		assert_eq!( selected.name, "new-named" );
		assert!( matches!( &selected.args[..], [ Val::String( name )] if name == "demo" ));
	}

	#[test]
	fn ties_keep_declaration_order() {
		let constructors = [
			ConstructorSignature::new( "new-a", [ ParameterSignature::new( "plugin-name", "string" )]),
			ConstructorSignature::new( "new-b", [ ParameterSignature::new( "plugin-version", "string" )]),
		];
		assert_eq!( select_constructor( &constructors, &registry(), &manifest() ).unwrap().name, "new-a" );
	}

	#[test]
	fn failure_names_first_missing_parameter_of_closest_candidate() {
		let constructors = [
			ConstructorSignature::new( "new", [
				ParameterSignature::new( "database", "string" ),
				ParameterSignature::new( "network", "string" ),
			]),
			ConstructorSignature::new( "new-with-name", [
				ParameterSignature::new( "plugin-name", "string" ),
				ParameterSignature::new( "clock", "u64" ),
			]),
		];
		let failure = select_constructor( &constructors, &registry(), &manifest() ).unwrap_err();
		assert_eq!( failure, InjectionFailure {
			constructor: "new-with-name".to_string(),
			parameter: "clock".to_string(),
			type_name: "u64".to_string(),
		});
	}

	#[test]
	fn providers_decline_mismatched_types() {
		let constructors = [ ConstructorSignature::new( "new", [ ParameterSignature::new( "plugin-name", "u32" )])];
		assert!( select_constructor( &constructors, &registry(), &manifest() ).is_err() );
	}

	#[test]
	fn chain_consults_injectors_in_order() {
		let chain = InjectorChain::new()
			.with(| request: &InjectionRequest<'_> | ( request.parameter == "plugin-name" ).then(|| Val::String( "override".into() )))
			.with( registry() );
		let constructors = [ ConstructorSignature::new( "new", [ ParameterSignature::new( "plugin-name", "string" )])];
		let selected = select_constructor( &constructors, &chain, &manifest() ).unwrap();
		assert!( matches!( &selected.args[..], [ Val::String( name )] if name == "override" ));
	}

}
