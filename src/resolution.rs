//! Package discovery pipeline.
//!
//! A [`PackageResolver`] produces a lazy stream of packages from some source. Producers
//! ([`DirectoryResolver`], [`ArchiveResolver`], [`RecursiveResolver`]) read manifests off
//! disk; decorators ([`SubpluginResolver`], [`ValidatingResolver`], [`DistinctResolver`],
//! [`PrioritizingResolver`], [`RewritingResolver`]) wrap another resolver and transform its
//! stream.
//!
//! Resolvers never fail as a whole. Every problem with an individual candidate becomes an
//! `Err` entry in the stream and the remaining candidates are still produced, so one
//! broken package cannot hide the others.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc ;
//! use wasm_plugin_loader::{
//! 	RecursiveResolver, SubpluginResolver, DistinctResolver, PackageResolver,
//! 	TomlManifestSerializer,
//! };
//!
//! let serializer = Arc::new( TomlManifestSerializer );
//! let resolver = DistinctResolver::by_unique_name( SubpluginResolver::new(
//! 	RecursiveResolver::new( "plugins", "manifest.toml", serializer.clone() ),
//! 	"manifest.toml",
//! 	serializer,
//! ));
//!
//! for outcome in resolver.resolve_packages() {
//! 	match outcome {
//! 		Ok( resolved ) => println!( "found {}", resolved.package.manifest() ),
//! 		Err( err ) => eprintln!( "skipped: {}", err ),
//! 	}
//! }
//! ```

mod directory ;
mod recursive ;
mod subplugin ;
mod validating ;
mod distinct ;
mod prioritizing ;
mod rewriting ;

pub use directory::{ DirectoryResolver, ArchiveResolver };
pub use recursive::RecursiveResolver ;
pub use subplugin::SubpluginResolver ;
pub use validating::ValidatingResolver ;
pub use distinct::DistinctResolver ;
pub use prioritizing::PrioritizingResolver ;
pub use rewriting::RewritingResolver ;

use std::sync::Arc ;
use itertools::Itertools ;
use thiserror::Error ;

use crate::manifest::{ ManifestError, ManifestSerializer };
use crate::package::{ PackageStorage, PluginPackage };
use crate::utils::PartialSuccess ;



/// Why a candidate package was not produced.
#[derive( Debug, Error )]
pub enum ResolutionError {
	/// The candidate root has no manifest file.
	#[error( "No '{file_name}' found in {location}" )]
	MissingManifest { location: String, file_name: String },
	/// The manifest file exists but could not be read.
	#[error( "Failed to read manifest in {location}: {source}" )]
	UnreadableManifest { location: String, source: std::io::Error },
	/// The manifest could not be parsed or failed schema validation.
	#[error( "Invalid manifest in {location}: {source}" )]
	InvalidManifest { location: String, source: ManifestError },
	/// The candidate source itself (archive, directory listing) could not be read.
	#[error( "Failed to read package source {location}: {source}" )]
	UnreadableSource { location: String, source: std::io::Error },
	/// A validation predicate rejected the package.
	#[error( "Package {package} failed validation: {message}" )]
	Validation { package: String, message: String },
	/// Several packages share a key that must be unique; none of them was kept.
	#[error( "Ambiguous packages for '{key}': {}", packages.join( ", " ))]
	DuplicateKey { key: String, packages: Vec<String> },
	/// Rewriting the package content (e.g. staging a local copy) failed.
	#[error( "Failed to prepare content of {package}: {source}" )]
	Staging { package: String, source: std::io::Error },
}

/// A package produced by a resolver, with non-fatal diagnostics attached.
#[derive( Debug, Clone )]
pub struct ResolvedPackage {
	pub package: PluginPackage,
	pub warnings: Vec<String>,
}

impl ResolvedPackage {
	pub fn new( package: PluginPackage ) -> Self { Self { package, warnings: Vec::with_capacity( 0 ) }}

	pub fn with_warning( mut self, warning: impl Into<String> ) -> Self {
		self.warnings.push( warning.into() );
		self
	}
}

/// One entry of a resolver stream.
pub type ResolveOutcome = Result<ResolvedPackage, ResolutionError> ;

/// Lazily produced resolver output.
pub type PackageStream<'a> = Box<dyn Iterator<Item = ResolveOutcome> + 'a> ;

/// A source of candidate packages.
pub trait PackageResolver {
	/// Streams every candidate this resolver knows about.
	///
	/// Implementations must not panic on bad input: failures are reported as `Err` entries.
	fn resolve_packages( &self ) -> PackageStream<'_> ;
}

impl<R: PackageResolver + ?Sized> PackageResolver for Box<R> {
	fn resolve_packages( &self ) -> PackageStream<'_> { ( **self ).resolve_packages() }
}

impl<R: PackageResolver + ?Sized> PackageResolver for &R {
	fn resolve_packages( &self ) -> PackageStream<'_> { ( **self ).resolve_packages() }
}

/// Concatenates the streams of several resolvers, in order.
#[derive( Default )]
pub struct CompositeResolver {
	resolvers: Vec<Box<dyn PackageResolver>>,
}

impl CompositeResolver {
	pub fn new() -> Self { Self::default() }

	pub fn with( mut self, resolver: impl PackageResolver + 'static ) -> Self {
		self.push( resolver );
		self
	}

	pub fn push( &mut self, resolver: impl PackageResolver + 'static ) {
		self.resolvers.push( Box::new( resolver ));
	}

	#[inline] pub fn len( &self ) -> usize { self.resolvers.len() }
	#[inline] pub fn is_empty( &self ) -> bool { self.resolvers.is_empty() }
}

impl PackageResolver for CompositeResolver {
	fn resolve_packages( &self ) -> PackageStream<'_> {
		Box::new( self.resolvers.iter().flat_map(| resolver | resolver.resolve_packages() ))
	}
}

/// Drains a resolver, splitting its stream into packages and errors.
pub fn resolve_all( resolver: &dyn PackageResolver ) -> PartialSuccess<Vec<ResolvedPackage>, ResolutionError> {
	resolver.resolve_packages().partition_result()
}

/// Short description of a package for diagnostics: `name@version (location)`.
pub(crate) fn describe( package: &PluginPackage ) -> String {
	format!( "{} ({})", package.manifest(), package.location() )
}

/// Reads the manifest at the root of `storage` and wraps both into a package.
pub(crate) fn read_package(
	storage: Arc<dyn PackageStorage>,
	manifest_name: &str,
	serializer: &dyn ManifestSerializer,
) -> ResolveOutcome {

	let location = storage.location();
	if !storage.contains( manifest_name ) {
		return Err( ResolutionError::MissingManifest { location, file_name: manifest_name.to_string() });
	}

	let bytes = storage.read( manifest_name )
		.map_err(| source | ResolutionError::UnreadableManifest { location: location.clone(), source })?;
	let manifest = serializer.load_manifest( &bytes )
		.map_err(| source | ResolutionError::InvalidManifest { location: location.clone(), source })?;

	tracing::debug!( package = %manifest, %location, "Resolved package" );
	Ok( ResolvedPackage::new( PluginPackage::new( manifest, storage )))

}
