//! Package identity, version and dependency metadata.
//!
//! A [`Manifest`] is the only thing the dependency resolver ever looks at: it names a
//! package, versions it, lists the packages it needs and assigns it to a coarse
//! [`LoadPhase`]. Manifests are totally ordered so that every collection keyed by them
//! iterates deterministically, which keeps resolution output stable across runs.

mod version ;
mod serializer ;

pub use version::parse_version ;
pub use serializer::{ ManifestSerializer, TomlManifestSerializer, JsonManifestSerializer };

use std::collections::BTreeSet ;
use semver::Version ;
use serde::{ Deserialize, Serialize };
use thiserror::Error ;



/// Errors produced while reading or writing a manifest.
#[derive( Debug, Error )]
pub enum ManifestError {
	/// The manifest bytes could not be decoded by the serializer.
	#[error( "Malformed manifest: {0}" )] Malformed( String ),
	/// The manifest could not be encoded by the serializer.
	#[error( "Failed to encode manifest: {0}" )] Encode( String ),
	/// A version string is not of the form `major.minor[.patch][-prerelease]`.
	#[error( "Invalid version '{version}': {reason}" )]
	InvalidVersion { version: String, reason: String },
	/// The manifest has an empty unique name.
	#[error( "Manifest has an empty unique name" )] EmptyName,
	/// The same package is listed twice among the dependencies.
	#[error( "Dependency '{0}' is declared more than once" )] DuplicateDependency( String ),
}

/// Coarse, externally ordered bucket a manifest is resolved and loaded in.
#[derive( Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize )]
#[serde( rename_all = "kebab-case" )]
pub enum LoadPhase {
	/// Loaded before the host finished its own initialisation.
	BeforeHostReady,
	/// Loaded once the host is ready.
	#[default] AfterHostReady,
}

impl LoadPhase {
	/// Every phase in the order they are resolved and loaded.
	pub const ALL: [LoadPhase; 2] = [ LoadPhase::BeforeHostReady, LoadPhase::AfterHostReady ];
}

impl std::fmt::Display for LoadPhase {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		match self {
			Self::BeforeHostReady => write!( f, "before-host-ready" ),
			Self::AfterHostReady => write!( f, "after-host-ready" ),
		}
	}
}

/// A declared dependency on another package.
///
/// A dependency is satisfied by a manifest with the same unique name whose version is at
/// least [`min_version`]( Self::min_version ), when one is given. Optional dependencies never
/// prevent a package from loading, but they still order it after the dependency when both
/// are present. Of two packages optionally depending on each other, the first by name loads
/// first.
#[derive( Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash )]
pub struct Dependency {
	unique_name: String,
	min_version: Option<Version>,
	required: bool,
}

impl Dependency {

	/// A dependency that must be present for the dependent to load.
	pub fn required( unique_name: impl Into<String> ) -> Self {
		Self { unique_name: unique_name.into(), min_version: None, required: true }
	}

	/// A dependency that only influences load order when present.
	pub fn optional( unique_name: impl Into<String> ) -> Self {
		Self { unique_name: unique_name.into(), min_version: None, required: false }
	}

	/// Requires the dependency to be at least `version`.
	pub fn at_least( mut self, version: Version ) -> Self {
		self.min_version = Some( version );
		self
	}

	#[inline] pub fn unique_name( &self ) -> &str { &self.unique_name }
	#[inline] pub fn min_version( &self ) -> Option<&Version> { self.min_version.as_ref() }
	#[inline] pub fn is_required( &self ) -> bool { self.required }

	/// Whether `manifest` fulfils this dependency.
	pub fn is_satisfied_by( &self, manifest: &Manifest ) -> bool {
		manifest.unique_name == self.unique_name
			&& self.min_version.as_ref().is_none_or(| min | manifest.version >= *min )
	}

}

impl std::fmt::Display for Dependency {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		write!( f, "{}", self.unique_name )?;
		if let Some( version ) = &self.min_version { write!( f, " (>= {})", version )?; }
		if !self.required { write!( f, " [optional]" )?; }
		Ok(())
	}
}

/// Identity and dependency metadata of one package.
///
/// # Example
///
/// ```
/// use wasm_plugin_loader::{ Manifest, Dependency, parse_version };
///
/// let manifest = Manifest::new( "acme.fixes", parse_version( "1.2" ).unwrap() )
/// 	.with_dependency( Dependency::required( "acme.core" ).at_least( parse_version( "1.0" ).unwrap() ))
/// 	.with_dependency( Dependency::optional( "acme.extras" ));
///
/// assert_eq!( manifest.unique_name(), "acme.fixes" );
/// assert_eq!( manifest.required_dependencies().count(), 1 );
/// ```
#[derive( Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash )]
pub struct Manifest {
	unique_name: String,
	version: Version,
	dependencies: BTreeSet<Dependency>,
	load_phase: LoadPhase,
	/// Path of the loadable code unit inside the package
	entry: Option<String>,
	/// Path of auxiliary data (e.g. debug symbols) handed to the code editor with the entry
	symbols: Option<String>,
	/// Relative roots of packages embedded in this one
	subplugins: Vec<String>,
}

impl Manifest {

	/// Creates a manifest with no dependencies in the default load phase.
	pub fn new( unique_name: impl Into<String>, version: Version ) -> Self {
		Self {
			unique_name: unique_name.into(),
			version,
			dependencies: BTreeSet::new(),
			load_phase: LoadPhase::default(),
			entry: None,
			symbols: None,
			subplugins: Vec::with_capacity( 0 ),
		}
	}

	pub fn with_dependency( mut self, dependency: Dependency ) -> Self {
		self.dependencies.insert( dependency );
		self
	}

	pub fn with_dependencies( mut self, dependencies: impl IntoIterator<Item = Dependency> ) -> Self {
		self.dependencies.extend( dependencies );
		self
	}

	pub fn with_load_phase( mut self, load_phase: LoadPhase ) -> Self {
		self.load_phase = load_phase ;
		self
	}

	pub fn with_entry( mut self, entry: impl Into<String> ) -> Self {
		self.entry = Some( entry.into() );
		self
	}

	pub fn with_symbols( mut self, symbols: impl Into<String> ) -> Self {
		self.symbols = Some( symbols.into() );
		self
	}

	pub fn with_subplugin( mut self, root: impl Into<String> ) -> Self {
		self.subplugins.push( root.into() );
		self
	}

	#[inline] pub fn unique_name( &self ) -> &str { &self.unique_name }
	#[inline] pub fn version( &self ) -> &Version { &self.version }
	#[inline] pub fn dependencies( &self ) -> &BTreeSet<Dependency> { &self.dependencies }
	#[inline] pub fn load_phase( &self ) -> LoadPhase { self.load_phase }
	#[inline] pub fn entry( &self ) -> Option<&str> { self.entry.as_deref() }
	#[inline] pub fn symbols( &self ) -> Option<&str> { self.symbols.as_deref() }
	#[inline] pub fn subplugins( &self ) -> &[String] { &self.subplugins }

	/// Dependencies that must be satisfied for this package to load.
	pub fn required_dependencies( &self ) -> impl Iterator<Item = &Dependency> {
		self.dependencies.iter().filter(| dependency | dependency.required )
	}

}

impl std::fmt::Display for Manifest {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		write!( f, "{}@{}", self.unique_name, self.version )
	}
}
