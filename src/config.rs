//! Loader configuration.
//!
//! [`LoaderConfig`] is read from TOML and builds the stock pipeline pieces: the package
//! resolver, the dependency resolver, the component loader and the optional code cache.
//!
//! ```toml
//! manifest_file_name = "plugin.toml"
//! plugin_dirs = [ "plugins", "/usr/share/acme/plugins" ]
//! staging_dir = "/var/cache/acme/staging"
//! cache_dir = "/var/cache/acme/code"
//! case_insensitive = true
//! contract_interface = "extension"
//! phases = [ "before-host-ready", "after-host-ready" ]
//! ```

use std::path::{ Path, PathBuf };
use std::sync::Arc ;
use pipe_trait::Pipe ;
use serde::{ Deserialize, Serialize };
use thiserror::Error ;
use wasmtime::Engine ;
use wasmtime::component::Linker ;

use crate::dependency::{ MultiPhaseResolver, TopologicalResolver };
use crate::editor::{ CachingCodeEditor, CodeEditor, EditError };
use crate::isolation::PluginContext ;
use crate::loader::ComponentLoader ;
use crate::manifest::{ JsonManifestSerializer, LoadPhase, Manifest, ManifestSerializer, TomlManifestSerializer };
use crate::package::normalise_path ;
use crate::resolution::{ CompositeResolver, PackageResolver, RecursiveResolver, RewritingResolver, SubpluginResolver };



#[derive( Debug, Error )]
pub enum ConfigError {
	#[error( "Failed to read config {path}: {source}" )]
	Read { path: PathBuf, source: std::io::Error },
	#[error( "Failed to parse config: {0}" )]
	Parse( #[from] toml::de::Error ),
	#[error( "Failed to encode config: {0}" )]
	Encode( #[from] toml::ser::Error ),
	#[error( "Invalid config: {0}" )]
	Invalid( String ),
	#[error( "Failed to set up code cache: {0}" )]
	Cache( #[from] EditError ),
}

/// Format of manifest files.
#[derive( Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize )]
#[serde( rename_all = "lowercase" )]
pub enum ManifestFormat {
	#[default]
	Toml,
	Json,
}

impl ManifestFormat {
	pub fn serializer( self ) -> Arc<dyn ManifestSerializer> { match self {
		Self::Toml => Arc::new( TomlManifestSerializer ),
		Self::Json => Arc::new( JsonManifestSerializer ),
	}}
}

/// Settings of the stock loading pipeline.
#[derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize )]
#[serde( default, deny_unknown_fields )]
pub struct LoaderConfig {
	/// Name of the manifest file at the root of every package.
	pub manifest_file_name: String,
	pub manifest_format: ManifestFormat,
	/// Directories searched recursively for packages.
	pub plugin_dirs: Vec<PathBuf>,
	/// When set, package content is copied here before loading.
	pub staging_dir: Option<PathBuf>,
	/// When set, edited code is cached here.
	pub cache_dir: Option<PathBuf>,
	/// Look up package entries ignoring ASCII case.
	pub case_insensitive: bool,
	/// Interface name components must export.
	pub contract_interface: String,
	/// Load phases, in loading order.
	pub phases: Vec<LoadPhase>,
}

impl Default for LoaderConfig {
	fn default() -> Self {
		Self {
			manifest_file_name: "manifest.toml".to_string(),
			manifest_format: ManifestFormat::default(),
			plugin_dirs: Vec::new(),
			staging_dir: None,
			cache_dir: None,
			case_insensitive: false,
			contract_interface: "extension".to_string(),
			phases: LoadPhase::ALL.to_vec(),
		}
	}
}

impl LoaderConfig {

	/// Parses and validates a TOML config. Missing keys take their default value.
	///
	/// # Errors
	/// Fails on malformed TOML, unknown keys or invalid values.
	pub fn from_toml_str( source: &str ) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str( source )?;
		config.validate()?;
		Ok( config )
	}

	/// Reads a TOML config file. Relative plugin, staging and cache directories are taken
	/// relative to the file's directory.
	///
	/// # Errors
	/// Fails if the file cannot be read, or like [`from_toml_str`]( Self::from_toml_str ).
	pub fn from_file( path: impl AsRef<Path> ) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let mut config = std::fs::read_to_string( path )
			.map_err(| source | ConfigError::Read { path: path.to_path_buf(), source })?
			.pipe(| source | Self::from_toml_str( &source ))?;
		if let Some( base ) = path.parent() {
			config.plugin_dirs.iter_mut().for_each(| dir | *dir = base.join( &*dir ));
			config.staging_dir = config.staging_dir.map(| dir | base.join( dir ));
			config.cache_dir = config.cache_dir.map(| dir | base.join( dir ));
		}
		tracing::debug!( path = %path.display(), dirs = config.plugin_dirs.len(), "Loaded loader config" );
		Ok( config )
	}

	/// # Errors
	/// Fails if the config cannot be represented as TOML.
	pub fn to_toml_string( &self ) -> Result<String, ConfigError> {
		Ok( toml::to_string_pretty( self )? )
	}

	/// Checks values that deserialize fine but cannot work.
	///
	/// # Errors
	/// Describes the first invalid value.
	pub fn validate( &self ) -> Result<(), ConfigError> {
		normalise_path( &self.manifest_file_name )
			.map_err(| err | ConfigError::Invalid( format!( "manifest_file_name: {}", err )))?;
		if self.contract_interface.is_empty() {
			return Err( ConfigError::Invalid( "contract_interface must not be empty".to_string() ));
		}
		if self.phases.is_empty() {
			return Err( ConfigError::Invalid( "at least one phase is required".to_string() ));
		}
		if let Some( phase ) = self.phases.iter().enumerate().find_map(| ( index, phase ) | self.phases[..index].contains( phase ).then_some( phase )) {
			return Err( ConfigError::Invalid( format!( "phase '{}' is listed twice", phase )));
		}
		Ok(())
	}

	/// The package resolver described by this config.
	///
	/// Every plugin directory is searched recursively, subplugins are expanded, content is
	/// staged and made case insensitive when configured. Duplicate unique names are left for
	/// the [`PluginHost`]( crate::PluginHost ) to reject.
	pub fn build_resolver( &self ) -> Box<dyn PackageResolver> {

		let serializer = self.manifest_format.serializer();
		let discovered = self.plugin_dirs.iter().fold( CompositeResolver::new(), | composite, dir |
			composite.with( RecursiveResolver::new( dir, &self.manifest_file_name, Arc::clone( &serializer )))
		);

		let mut resolver: Box<dyn PackageResolver> = Box::new( SubpluginResolver::new( discovered, &self.manifest_file_name, serializer ));
		if let Some( staging_dir ) = &self.staging_dir {
			resolver = Box::new( RewritingResolver::staged( resolver, staging_dir ));
		}
		if self.case_insensitive {
			resolver = Box::new( RewritingResolver::case_insensitive( resolver ));
		}
		resolver

	}

	/// The phase-aware dependency resolver described by this config.
	pub fn dependency_resolver( &self ) -> MultiPhaseResolver<TopologicalResolver, fn( &Manifest ) -> LoadPhase, LoadPhase> {
		MultiPhaseResolver::new( TopologicalResolver, Manifest::load_phase as fn( &Manifest ) -> LoadPhase, self.phases.iter().copied() )
	}

	/// A component loader honouring the contract name and code cache of this config.
	///
	/// # Errors
	/// Fails if the cache directory cannot be created.
	pub fn component_loader<Ctx: PluginContext>(
		&self,
		engine: &Engine,
		linker: Linker<Ctx>,
		editor: Option<Arc<dyn CodeEditor>>,
	) -> Result<ComponentLoader<Ctx>, ConfigError> {
		let loader = ComponentLoader::new( engine, linker ).with_contract( &self.contract_interface );
		Ok( match editor {
			Some( editor ) => loader.with_editor( self.caching_editor( editor )? ),
			Option::None => loader,
		})
	}

	/// Wraps `editor` in a [`CachingCodeEditor`] when a cache directory is configured.
	///
	/// # Errors
	/// Fails if the cache directory cannot be created.
	pub fn caching_editor( &self, editor: Arc<dyn CodeEditor> ) -> Result<Arc<dyn CodeEditor>, ConfigError> {
		Ok( match &self.cache_dir {
			Some( cache_dir ) => Arc::new( CachingCodeEditor::new( editor, cache_dir )? ),
			Option::None => editor,
		})
	}

}

#[cfg( test )]
mod tests {

	use super::* ;

	#[test]
	fn missing_keys_take_defaults() {
		let config = LoaderConfig::from_toml_str( r#"plugin_dirs = [ "plugins" ]"# ).unwrap();
		assert_eq!( config.manifest_file_name, "manifest.toml" );
		assert_eq!( config.plugin_dirs, vec![ PathBuf::from( "plugins" )]);
		assert_eq!( config.phases, LoadPhase::ALL.to_vec() );
	}

	#[test]
	fn unknown_keys_are_rejected() {
		assert!( matches!( LoaderConfig::from_toml_str( "plugin_dir = \"x\"" ), Err( ConfigError::Parse( _ ))));
	}

	#[test]
	fn duplicate_phases_are_invalid() {
		let source = r#"phases = [ "after-host-ready", "after-host-ready" ]"#;
		assert!( matches!( LoaderConfig::from_toml_str( source ), Err( ConfigError::Invalid( _ ))));
	}

	#[test]
	fn escaping_manifest_name_is_invalid() {
		assert!( matches!( LoaderConfig::from_toml_str( r#"manifest_file_name = "../manifest.toml""# ), Err( ConfigError::Invalid( _ ))));
	}

	#[test]
	fn config_survives_a_toml_round_trip() {
		let config = LoaderConfig { case_insensitive: true, cache_dir: Some( "cache".into() ), ..LoaderConfig::default() };
		assert_eq!( LoaderConfig::from_toml_str( &config.to_toml_string().unwrap() ).unwrap(), config );
	}

}
