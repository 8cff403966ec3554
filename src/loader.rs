//! Turning packages into plugins.
//!
//! A [`PluginLoader`] is asked whether it [can load]( PluginLoader::can_load ) a package and,
//! if it says [`CanLoad::Yes`], to [load]( PluginLoader::load ) it. Loaders compose:
//! - [`ExtendableLoader`] delegates to the first of several loaders that accepts a package;
//! - [`ConditionalLoader`] only accepts packages matching a predicate;
//! - [`NarrowingLoader`] converts the manifest into the type its inner loader expects;
//! - [`ValidatingLoader`] checks the produced plugin.
//!
//! [`ComponentLoader`] is the loader that actually compiles and constructs WebAssembly
//! components.

mod extendable ;
mod conditional ;
mod narrowing ;
mod validating ;
mod component ;
mod injection ;

pub use extendable::ExtendableLoader ;
pub use conditional::ConditionalLoader ;
pub use narrowing::NarrowingLoader ;
pub use validating::ValidatingLoader ;
pub use component::{ ComponentLoader, ComponentManifest };
pub use injection::{
	InjectionRequest, ParameterInjector, InjectorRegistry, InjectorChain,
	ConstructorSignature, ParameterSignature, SelectedConstructor, InjectionFailure,
	select_constructor,
};

use thiserror::Error ;

use crate::editor::EditError ;
use crate::extension::DispatchError ;
use crate::manifest::Manifest ;
use crate::package::PluginPackage ;



/// Answer of [`PluginLoader::can_load`].
#[derive( Clone, Debug, PartialEq, Eq )]
pub enum CanLoad {
	/// The loader will handle the package.
	Yes,
	/// The package is not meant for this loader.
	No,
	/// The package is meant for this loader but cannot be loaded.
	Error( String ),
}

/// A loaded plugin with the warnings collected while loading it.
#[derive( Debug )]
pub struct LoadSuccess<P> {
	pub plugin: P,
	pub warnings: Vec<String>,
}

impl<P> LoadSuccess<P> {
	pub fn new( plugin: P ) -> Self { Self { plugin, warnings: Vec::with_capacity( 0 ) }}

	pub fn with_warnings( mut self, warnings: impl IntoIterator<Item = String> ) -> Self {
		self.warnings.extend( warnings );
		self
	}

	/// Applies `map` to the plugin, keeping the warnings.
	pub fn map<Q>( self, map: impl FnOnce( P ) -> Q ) -> LoadSuccess<Q> {
		LoadSuccess { plugin: map( self.plugin ), warnings: self.warnings }
	}
}

/// Why a package failed to load.
#[derive( Debug, Error )]
pub enum LoadError {
	#[error( "No loader accepts package {package}" )]
	NoLoader { package: String },
	#[error( "Package {package} was rejected: {reason}" )]
	Rejected { package: String, reason: String },
	#[error( "Package {package} has no entry '{entry}'" )]
	MissingEntry { package: String, entry: String },
	#[error( "Failed to read '{entry}' of {package}: {source}" )]
	UnreadableEntry { package: String, entry: String, source: std::io::Error },
	#[error( "Failed to edit code of {package}: {source}" )]
	Edit { package: String, source: EditError },
	#[error( "Failed to compile {package}: {cause}" )]
	Compile { package: String, cause: wasmtime::Error },
	#[error( "Package {package} exports no '{contract}' interface" )]
	NoExtension { package: String, contract: String },
	#[error( "Package {package} exports several '{contract}' interfaces: {}", candidates.join( ", " ))]
	AmbiguousExtension { package: String, contract: String, candidates: Vec<String> },
	#[error( "No constructor of {package} can be fully injected: parameter '{parameter}' ({type_name}) of '{constructor}' has no provider" )]
	NoInjectableConstructor { package: String, constructor: String, parameter: String, type_name: String },
	#[error( "Failed to instantiate {package}: {cause}" )]
	Instantiation { package: String, cause: wasmtime::Error },
	#[error( "Constructor '{constructor}' of {package} failed: {source}" )]
	Construction { package: String, constructor: String, source: DispatchError },
	/// The loaded plugin was rejected after the fact. Warnings gathered before are kept.
	#[error( "Package {package} failed validation: {message}" )]
	Validation { package: String, message: String, warnings: Vec<String> },
	#[error( "Package {package} was not loaded because its dependency {dependency} failed" )]
	DependencyFailed { package: String, dependency: String },
}

/// Loads packages of manifest type `M`.
pub trait PluginLoader<M = Manifest> {

	/// What a successful load produces.
	type Plugin ;

	/// Whether this loader handles `package`.
	fn can_load( &self, package: &PluginPackage<M> ) -> CanLoad ;

	/// Loads `package`.
	///
	/// Must only be called for packages this loader answered [`CanLoad::Yes`] for; loaders
	/// are free to panic otherwise.
	///
	/// # Errors
	/// Any failure to turn the package into a plugin.
	fn load( &self, package: &PluginPackage<M> ) -> Result<LoadSuccess<Self::Plugin>, LoadError> ;

}

impl<M, L: PluginLoader<M> + ?Sized> PluginLoader<M> for Box<L> {
	type Plugin = L::Plugin ;
	fn can_load( &self, package: &PluginPackage<M> ) -> CanLoad { ( **self ).can_load( package )}
	fn load( &self, package: &PluginPackage<M> ) -> Result<LoadSuccess<Self::Plugin>, LoadError> { ( **self ).load( package )}
}

impl<M, L: PluginLoader<M> + ?Sized> PluginLoader<M> for &L {
	type Plugin = L::Plugin ;
	fn can_load( &self, package: &PluginPackage<M> ) -> CanLoad { ( **self ).can_load( package )}
	fn load( &self, package: &PluginPackage<M> ) -> Result<LoadSuccess<Self::Plugin>, LoadError> { ( **self ).load( package )}
}

/// Short description of a package for diagnostics: `name@version (location)`.
pub(crate) fn describe<M: std::fmt::Display>( package: &PluginPackage<M> ) -> String {
	format!( "{} ({})", package.manifest(), package.location() )
}
