//! End-to-end loading.
//!
//! [`PluginHost`] runs the whole pipeline: it drains a [`PackageResolver`], rejects packages
//! sharing a unique name, orders the rest with a [`DependencyResolver`] and loads them step
//! by step with a [`PluginLoader`]. The outcome of every package is collected in a
//! [`LoadReport`]; nothing is fatal to the run as a whole.

use std::collections::{ BTreeMap, HashMap };

use crate::dependency::{ DependencyResolver, LoadStep, UnresolvableReason };
use crate::hooks::HookPoint ;
use crate::loader::{ CanLoad, LoadError, LoadSuccess, PluginLoader };
use crate::manifest::Manifest ;
use crate::package::PluginPackage ;
use crate::resolution::{ DistinctResolver, PackageResolver, ResolutionError, ResolvedPackage, resolve_all };
use crate::utils::Merge ;



/// A package that was loaded.
#[derive( Debug )]
pub struct LoadedPlugin<P> {
	pub package: PluginPackage,
	pub plugin: P,
	/// Resolution and load warnings, in that order.
	pub warnings: Vec<String>,
	/// Index of the load step the package belonged to.
	pub step: usize,
}

/// A package that was placed in a load step but did not load.
#[derive( Debug )]
pub struct FailedPlugin {
	pub manifest: Manifest,
	pub error: LoadError,
}

/// Terminal state of a package after [`PluginHost::load_all`].
#[derive( Clone, Copy, Debug, PartialEq, Eq )]
pub enum PackageState {
	Loaded { step: usize },
	LoadFailed,
	Unresolvable,
	/// Another package had the same unique name; neither was loaded.
	DuplicateRejected,
}

/// Everything that happened during [`PluginHost::load_all`].
#[derive( Debug )]
pub struct LoadReport<P> {
	pub loaded: Vec<LoadedPlugin<P>>,
	pub failed: Vec<FailedPlugin>,
	pub unresolvable: BTreeMap<Manifest, UnresolvableReason>,
	/// Candidates dropped during resolution.
	pub rejected: Vec<ResolutionError>,
	pub load_steps: Vec<LoadStep>,
}

impl<P> Default for LoadReport<P> {
	fn default() -> Self {
		Self {
			loaded: Vec::new(),
			failed: Vec::new(),
			unresolvable: BTreeMap::new(),
			rejected: Vec::new(),
			load_steps: Vec::new(),
		}
	}
}

impl<P> LoadReport<P> {

	/// What became of the package called `unique_name`, if it was seen at all.
	pub fn state_of( &self, unique_name: &str ) -> Option<PackageState> {
		if let Some( loaded ) = self.loaded.iter().find(| loaded | loaded.package.manifest().unique_name() == unique_name ) {
			return Some( PackageState::Loaded { step: loaded.step });
		}
		if self.failed.iter().any(| failed | failed.manifest.unique_name() == unique_name ) {
			return Some( PackageState::LoadFailed );
		}
		if self.unresolvable.keys().any(| manifest | manifest.unique_name() == unique_name ) {
			return Some( PackageState::Unresolvable );
		}
		self.rejected.iter()
			.any(| error | matches!( error, ResolutionError::DuplicateKey { key, .. } if key == unique_name ))
			.then_some( PackageState::DuplicateRejected )
	}

	/// The loaded plugin of the package called `unique_name`.
	pub fn plugin( &self, unique_name: &str ) -> Option<&P> {
		self.loaded.iter()
			.find(| loaded | loaded.package.manifest().unique_name() == unique_name )
			.map(| loaded | &loaded.plugin )
	}

	pub fn is_clean( &self ) -> bool {
		self.failed.is_empty() && self.unresolvable.is_empty() && self.rejected.is_empty()
	}

}

type LoadHook<P> = HookPoint<PluginPackage, Result<LoadSuccess<P>, LoadError>> ;

/// Drives resolution, dependency ordering and loading.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc ;
/// use wasm_plugin_loader::{
/// 	PluginHost, ComponentLoader, NarrowingLoader, DefaultContext, MultiPhaseResolver,
/// 	TopologicalResolver, RecursiveResolver, TomlManifestSerializer, Engine, Linker,
/// };
///
/// let engine = Engine::default();
/// let loader = NarrowingLoader::components( ComponentLoader::<DefaultContext>::new( &engine, Linker::new( &engine )));
/// let host = PluginHost::new( loader, MultiPhaseResolver::by_load_phase( TopologicalResolver ));
///
/// let resolver = RecursiveResolver::new( "plugins", "manifest.toml", Arc::new( TomlManifestSerializer ));
/// let report = host.load_all( &resolver, &[] );
/// for loaded in &report.loaded {
/// 	println!( "{} exports {}", loaded.package.manifest(), loaded.plugin.export() );
/// }
/// ```
pub struct PluginHost<L: PluginLoader, D> {
	loader: L,
	dependencies: D,
	load_hook: LoadHook<L::Plugin>,
}

impl<L: PluginLoader, D: DependencyResolver> PluginHost<L, D> {

	pub fn new( loader: L, dependencies: D ) -> Self {
		Self { loader, dependencies, load_hook: HookPoint::new( "load" )}
	}

	#[inline] pub fn loader( &self ) -> &L { &self.loader }
	#[inline] pub fn dependencies( &self ) -> &D { &self.dependencies }

	/// Interception point around [`PluginLoader::load`], run for every accepted package.
	#[inline] pub fn load_hook( &mut self ) -> &mut LoadHook<L::Plugin> { &mut self.load_hook }

	/// Resolves and loads every package `resolver` produces.
	///
	/// Manifests in `already_resolved` count as loaded for dependency purposes.
	pub fn load_all( &self, resolver: &dyn PackageResolver, already_resolved: &[Manifest] ) -> LoadReport<L::Plugin> {

		let mut report = LoadReport::default();

		let ( packages, rejected ) = resolve_all( &DistinctResolver::by_unique_name( resolver ));
		rejected.iter().for_each(| error | tracing::warn!( %error, "Package rejected during resolution" ));
		report.rejected = rejected ;

		let manifests = packages.iter().map(| resolved | resolved.package.manifest().clone() ).collect::<Vec<_>>();
		let mut packages = packages.into_iter()
			.map(| resolved | ( resolved.package.manifest().unique_name().to_string(), resolved ))
			.collect::<HashMap<_, _>>();

		let resolution = self.dependencies.resolve_dependencies( &manifests, already_resolved );
		for ( manifest, reason ) in &resolution.unresolvable {
			tracing::warn!( package = %manifest, %reason, "Package cannot be loaded" );
			if let Some( resolved ) = packages.remove( manifest.unique_name() ) { resolved.package.dispose(); }
		}
		report.unresolvable = resolution.unresolvable ;

		let mut available = already_resolved.to_vec();
		for ( step, manifests ) in resolution.load_steps.iter().enumerate() {

			tracing::debug!( step, size = manifests.len(), "Loading step" );
			let ( loaded, failed ) = manifests.iter()
				.filter_map(| manifest | packages.remove( manifest.unique_name() ))
				.map(| resolved | self.load_one( resolved, &available, step ))
				.fold(( Vec::new(), Vec::new() ), | ( loaded, failed ), outcome | match outcome {
					Ok( plugin ) => ( loaded.merge( plugin ), failed ),
					Err( failure ) => ( loaded, failed.merge( failure )),
				});

			failed.iter().for_each(| failed: &FailedPlugin | tracing::warn!( error = %failed.error, "Package failed to load" ));
			available.extend( loaded.iter().map(| loaded: &LoadedPlugin<L::Plugin> | loaded.package.manifest().clone() ));
			report.loaded.extend( loaded );
			report.failed.extend( failed );

		}
		report.load_steps = resolution.load_steps ;

		tracing::info!(
			loaded = report.loaded.len(),
			failed = report.failed.len(),
			unresolvable = report.unresolvable.len(),
			rejected = report.rejected.len(),
			"Plugin loading finished"
		);
		report

	}

	fn load_one( &self, resolved: ResolvedPackage, available: &[Manifest], step: usize ) -> Result<LoadedPlugin<L::Plugin>, FailedPlugin> {

		let ResolvedPackage { mut package, warnings } = resolved ;
		let manifest = package.manifest().clone();
		let failure = | package: PluginPackage, error: LoadError | {
			package.dispose();
			FailedPlugin { manifest: manifest.clone(), error }
		};

		let failed_dependency = manifest.required_dependencies()
			.find(| dependency | !available.iter().any(| candidate | dependency.is_satisfied_by( candidate )));
		if let Some( dependency ) = failed_dependency {
			let error = LoadError::DependencyFailed { package: manifest.to_string(), dependency: dependency.to_string() };
			return Err( failure( package, error ));
		}

		match self.loader.can_load( &package ) {
			CanLoad::Yes => {},
			CanLoad::No => {
				let error = LoadError::NoLoader { package: manifest.to_string() };
				return Err( failure( package, error ));
			},
			CanLoad::Error( reason ) => {
				let error = LoadError::Rejected { package: manifest.to_string(), reason };
				return Err( failure( package, error ));
			},
		}

		match self.load_hook.invoke( &mut package, | package | self.loader.load( package )) {
			Ok( success ) => {
				warnings.iter().chain( &success.warnings )
					.for_each(| warning | tracing::warn!( package = %manifest, %warning, "Load warning" ));
				tracing::info!( package = %manifest, step, "Loaded plugin" );
				Ok( LoadedPlugin {
					package,
					plugin: success.plugin,
					warnings: warnings.merge_all( success.warnings ),
					step,
				})
			},
			Err( error ) => Err( failure( package, error )),
		}

	}

}
