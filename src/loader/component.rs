use std::collections::HashMap ;
use std::sync::Arc ;
use wasmtime::Engine ;
use wasmtime::component::{ Component, Linker };
use wasmtime::component::types::{ ComponentInstance, ComponentItem, Type };

use crate::editor::CodeEditor ;
use crate::extension::ExtensionInstance ;
use crate::isolation::{ ContextProvider, PluginContext };
use crate::manifest::Manifest ;
use crate::package::PluginPackage ;
use super::{ CanLoad, LoadError, LoadSuccess, PluginLoader, describe };
use super::injection::{
	ConstructorSignature, InjectorChain, InjectorRegistry, ParameterInjector, ParameterSignature,
	select_constructor,
};



/// A manifest describing a WebAssembly component package.
///
/// The entry must be a component, either binary (`.wasm`) or text (`.wat`).
#[derive( Clone, Debug, PartialEq, Eq )]
pub struct ComponentManifest {
	manifest: Manifest,
	entry: String,
}

impl ComponentManifest {

	/// Entry used when the manifest does not name one.
	pub const DEFAULT_ENTRY: &'static str = "plugin.wasm" ;
	pub const EXTENSIONS: [&'static str; 2] = [ ".wasm", ".wat" ];

	/// Narrows a manifest, failing if its entry is not a component.
	///
	/// # Errors
	/// Returns the reason the manifest is not a component manifest.
	pub fn narrow( manifest: &Manifest ) -> Result<Self, String> {
		let entry = manifest.entry().unwrap_or( Self::DEFAULT_ENTRY );
		match Self::EXTENSIONS.iter().any(| extension | entry.to_ascii_lowercase().ends_with( extension )) {
			true => Ok( Self { manifest: manifest.clone(), entry: entry.to_string() }),
			false => Err( format!( "entry '{}' is not a WebAssembly component", entry )),
		}
	}

	#[inline] pub fn manifest( &self ) -> &Manifest { &self.manifest }
	#[inline] pub fn entry( &self ) -> &str { &self.entry }
	#[inline] pub fn symbols( &self ) -> Option<&str> { self.manifest.symbols() }

}

impl std::fmt::Display for ComponentManifest {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result { std::fmt::Display::fmt( &self.manifest, f )}
}

/// Loads WebAssembly components and constructs their extension.
///
/// Loading a package:
/// 1. obtains the package's isolation unit from the [`ContextProvider`];
/// 2. reads the entry and the optional symbol file, and passes both through the configured
/// 	[`CodeEditor`] whose messages become load warnings;
/// 3. compiles the component and finds the single exported interface instance named after
/// 	the contract (`extension` unless configured otherwise). The package namespace and any
/// 	`@version` suffix are ignored, so `acme:demo/extension@1.0.0` matches;
/// 4. picks a constructor among the functions of that interface called `new` or `new-*`,
/// 	using the injectors to supply its arguments. An interface without constructors is
/// 	used as is;
/// 5. instantiates the component in the unit and calls the constructor.
///
/// # Type Parameters
/// - `Ctx`: data of the isolation unit stores, see [`PluginContext`]
pub struct ComponentLoader<Ctx: 'static> {
	engine: Engine,
	linker: Linker<Ctx>,
	contexts: Arc<ContextProvider<Ctx>>,
	contract: String,
	injectors: InjectorChain,
	editor: Option<Arc<dyn CodeEditor>>,
}

impl<Ctx: PluginContext> ComponentLoader<Ctx> {

	pub const DEFAULT_CONTRACT: &'static str = "extension" ;

	/// Creates a loader instantiating components through `linker`.
	///
	/// Host functions available to plugins must be added to the linker beforehand. The
	/// default injectors supply the package metadata (see
	/// [`InjectorRegistry::with_package_metadata`]).
	pub fn new( engine: &Engine, linker: Linker<Ctx> ) -> Self {
		Self {
			engine: engine.clone(),
			linker,
			contexts: Arc::new( ContextProvider::new( engine.clone() )),
			contract: Self::DEFAULT_CONTRACT.to_string(),
			injectors: InjectorChain::new().with( InjectorRegistry::new().with_package_metadata() ),
			editor: None,
		}
	}

	/// Looks for the interface called `contract` instead of `extension`.
	pub fn with_contract( mut self, contract: impl Into<String> ) -> Self {
		self.contract = contract.into();
		self
	}

	/// Consults `injector` before the injectors configured so far.
	pub fn with_injector( mut self, injector: impl ParameterInjector + 'static ) -> Self {
		self.injectors = InjectorChain::new().with( injector ).with( self.injectors );
		self
	}

	/// Replaces every injector.
	pub fn with_injectors( mut self, injectors: InjectorChain ) -> Self {
		self.injectors = injectors ;
		self
	}

	pub fn with_editor( mut self, editor: Arc<dyn CodeEditor> ) -> Self {
		self.editor = Some( editor );
		self
	}

	/// Shares isolation units with other loaders using the same provider.
	pub fn with_contexts( mut self, contexts: Arc<ContextProvider<Ctx>> ) -> Self {
		self.contexts = contexts ;
		self
	}

	#[inline] pub fn engine( &self ) -> &Engine { &self.engine }
	#[inline] pub fn contract( &self ) -> &str { &self.contract }
	#[inline] pub fn contexts( &self ) -> &Arc<ContextProvider<Ctx>> { &self.contexts }

	fn read_entry( package: &PluginPackage<ComponentManifest>, entry: &str ) -> Result<Vec<u8>, LoadError> {
		package.read( entry ).map_err(| source | match source.kind() {
			std::io::ErrorKind::NotFound => LoadError::MissingEntry { package: describe( package ), entry: entry.to_string() },
			_ => LoadError::UnreadableEntry { package: describe( package ), entry: entry.to_string(), source },
		})
	}

	fn matches_contract( &self, export_name: &str ) -> bool {
		let unversioned = export_name.split_once( '@' ).map_or( export_name, | ( name, _ ) | name );
		let interface = unversioned.rsplit_once( '/' ).map_or( unversioned, | ( _, name ) | name );
		interface == self.contract
	}

	fn find_extension(
		&self,
		component: &Component,
		package: &PluginPackage<ComponentManifest>,
	) -> Result<( String, ComponentInstance ), LoadError> {

		let mut candidates = component.component_type().exports( &self.engine )
			.filter_map(| ( name, item ) | match item {
				ComponentItem::ComponentInstance( instance ) if self.matches_contract( name ) => Some(( name.to_string(), instance )),
				_ => None,
			})
			.collect::<Vec<_>>();

		match candidates.len() {
			0 => Err( LoadError::NoExtension { package: describe( package ), contract: self.contract.clone() }),
			1 => Ok( candidates.remove( 0 )),
			_ => Err( LoadError::AmbiguousExtension {
				package: describe( package ),
				contract: self.contract.clone(),
				candidates: candidates.into_iter().map(| ( name, _ ) | name ).collect(),
			}),
		}

	}

	fn describe_functions( &self, instance: &ComponentInstance ) -> ( Vec<ConstructorSignature>, HashMap<String, usize> ) {

		let mut constructors = Vec::new();
		let mut result_counts = HashMap::new();

		for ( name, item ) in instance.exports( &self.engine ) {
			let ComponentItem::ComponentFunc( func ) = item else { continue };
			result_counts.insert( name.to_string(), func.results().len() );
			if name == "new" || name.starts_with( "new-" ) {
				constructors.push( ConstructorSignature::new( name, func.params()
					.map(| ( param, ty ) | ParameterSignature::new( param, type_name( &ty )))
				));
			}
		}

		( constructors, result_counts )

	}

}

impl<Ctx: PluginContext> PluginLoader<ComponentManifest> for ComponentLoader<Ctx> {

	type Plugin = ExtensionInstance<Ctx> ;

	fn can_load( &self, package: &PluginPackage<ComponentManifest> ) -> CanLoad {
		match package.storage().contains( package.manifest().entry() ) {
			true => CanLoad::Yes,
			false => CanLoad::Error( format!( "entry '{}' not found in {}", package.manifest().entry(), package.location() )),
		}
	}

	fn load( &self, package: &PluginPackage<ComponentManifest> ) -> Result<LoadSuccess<Self::Plugin>, LoadError> {

		let manifest = package.manifest();
		let unit = self.contexts.get_context( package.id(), manifest.manifest() );

		let code = Self::read_entry( package, manifest.entry() )?;
		let symbols = manifest.symbols().map(| path | Self::read_entry( package, path )).transpose()?;

		let mut warnings = Vec::with_capacity( 0 );
		let code = match &self.editor {
			Some( editor ) => {
				let edited = editor.edit( manifest.manifest().unique_name(), &code, symbols.as_deref() )
					.map_err(| source | LoadError::Edit { package: describe( package ), source })?;
				warnings.extend( edited.messages );
				edited.code
			},
			Option::None => code,
		};

		let component = Component::new( &self.engine, &code )
			.map_err(| cause | LoadError::Compile { package: describe( package ), cause })?;
		let ( export, interface ) = self.find_extension( &component, package )?;
		let ( constructors, result_counts ) = self.describe_functions( &interface );

		let selected = match constructors.is_empty() {
			true => Option::None,
			false => Some( select_constructor( &constructors, &self.injectors, manifest.manifest() )
				.map_err(| failure | LoadError::NoInjectableConstructor {
					package: describe( package ),
					constructor: failure.constructor,
					parameter: failure.parameter,
					type_name: failure.type_name,
				})?),
		};

		let instance = unit.instantiate( &self.linker, &component )
			.map_err(| cause | LoadError::Instantiation { package: describe( package ), cause })?;
		let extension = ExtensionInstance::new( unit, instance, export, result_counts );

		let extension = match selected {
			Some( constructor ) => extension.construct( &constructor.name, &constructor.args )
				.map_err(| source | LoadError::Construction { package: describe( package ), constructor: constructor.name.clone(), source })?,
			Option::None => extension,
		};

		tracing::debug!( package = %manifest, export = extension.export(), constructor = extension.constructor(), "Constructed extension" );
		Ok( LoadSuccess::new( extension ).with_warnings( warnings ))

	}

}

/// WIT name of a component value type.
fn type_name( ty: &Type ) -> &'static str {
	match ty {
		Type::Bool => "bool",
		Type::S8 => "s8",
		Type::U8 => "u8",
		Type::S16 => "s16",
		Type::U16 => "u16",
		Type::S32 => "s32",
		Type::U32 => "u32",
		Type::S64 => "s64",
		Type::U64 => "u64",
		Type::Float32 => "f32",
		Type::Float64 => "f64",
		Type::Char => "char",
		Type::String => "string",
		Type::List( _ ) => "list",
		Type::Record( _ ) => "record",
		Type::Tuple( _ ) => "tuple",
		Type::Variant( _ ) => "variant",
		Type::Enum( _ ) => "enum",
		Type::Option( _ ) => "option",
		Type::Result( _ ) => "result",
		Type::Flags( _ ) => "flags",
		Type::Own( _ ) => "own",
		Type::Borrow( _ ) => "borrow",
		_ => "unsupported",
	}
}

#[cfg( test )]
mod tests {

	use super::* ;
	use crate::manifest::parse_version ;

	#[test]
	fn narrowing_requires_a_component_entry() {
		let manifest = Manifest::new( "demo", parse_version( "1.0" ).unwrap() );
		assert_eq!( ComponentManifest::narrow( &manifest ).unwrap().entry(), "plugin.wasm" );
		assert_eq!( ComponentManifest::narrow( &manifest.clone().with_entry( "src/Plugin.WAT" )).unwrap().entry(), "src/Plugin.WAT" );
		assert!( ComponentManifest::narrow( &manifest.with_entry( "plugin.jar" )).is_err() );
	}

	#[test]
	fn contract_matching_ignores_namespace_and_version() {
		let engine = Engine::default();
		let loader = ComponentLoader::<crate::isolation::DefaultContext>::new( &engine, Linker::new( &engine ));
		assert!( loader.matches_contract( "extension" ));
		assert!( loader.matches_contract( "acme:demo/extension" ));
		assert!( loader.matches_contract( "acme:demo/extension@1.2.0" ));
		assert!( !loader.matches_contract( "acme:demo/extensions" ));
	}

}
