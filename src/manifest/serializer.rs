//! Manifest (de)serialization.
//!
//! The core never depends on a concrete manifest format: resolvers are handed a
//! [`ManifestSerializer`]. Two stock implementations share one serde document whose
//! field names follow the published manifest schema (`uniqueName`, `loadPhase`, ...).

use std::collections::BTreeSet ;
use serde::{ Deserialize, Serialize };

use super::{ Manifest, Dependency, LoadPhase, ManifestError, parse_version };



/// Converts manifests to and from their on-disk representation.
pub trait ManifestSerializer: Send + Sync {

	/// Decodes and validates a manifest.
	///
	/// # Errors
	/// Returns [`ManifestError`] if the bytes are not a valid manifest.
	fn load_manifest( &self, bytes: &[u8] ) -> Result<Manifest, ManifestError> ;

	/// Encodes a manifest.
	///
	/// # Errors
	/// Returns [`ManifestError::Encode`] if the format cannot represent the manifest.
	fn save_manifest( &self, manifest: &Manifest ) -> Result<Vec<u8>, ManifestError> ;

}

/// Reads and writes `manifest.toml` style manifests.
#[derive( Debug, Default, Clone, Copy )]
pub struct TomlManifestSerializer ;

impl ManifestSerializer for TomlManifestSerializer {

	fn load_manifest( &self, bytes: &[u8] ) -> Result<Manifest, ManifestError> {
		let text = std::str::from_utf8( bytes ).map_err(| err | ManifestError::Malformed( err.to_string() ))?;
		toml::from_str::<ManifestDocument>( text )
			.map_err(| err | ManifestError::Malformed( err.to_string() ))?
			.try_into()
	}

	fn save_manifest( &self, manifest: &Manifest ) -> Result<Vec<u8>, ManifestError> {
		toml::to_string( &ManifestDocument::from( manifest ))
			.map( String::into_bytes )
			.map_err(| err | ManifestError::Encode( err.to_string() ))
	}

}

/// Reads and writes `manifest.json` style manifests.
#[derive( Debug, Default, Clone, Copy )]
pub struct JsonManifestSerializer ;

impl ManifestSerializer for JsonManifestSerializer {

	fn load_manifest( &self, bytes: &[u8] ) -> Result<Manifest, ManifestError> {
		serde_json::from_slice::<ManifestDocument>( bytes )
			.map_err(| err | ManifestError::Malformed( err.to_string() ))?
			.try_into()
	}

	fn save_manifest( &self, manifest: &Manifest ) -> Result<Vec<u8>, ManifestError> {
		serde_json::to_vec_pretty( &ManifestDocument::from( manifest ))
			.map_err(| err | ManifestError::Encode( err.to_string() ))
	}

}

#[derive( Debug, Serialize, Deserialize )]
#[serde( rename_all = "camelCase" )]
struct ManifestDocument {
	unique_name: String,
	version: String,
	#[serde( default )]
	load_phase: LoadPhase,
	#[serde( default, skip_serializing_if = "Option::is_none" )]
	entry: Option<String>,
	#[serde( default, skip_serializing_if = "Option::is_none" )]
	symbols: Option<String>,
	#[serde( default, skip_serializing_if = "Vec::is_empty" )]
	subplugins: Vec<String>,
	// Arrays of tables go last so TOML output stays valid.
	#[serde( default, skip_serializing_if = "Vec::is_empty" )]
	dependencies: Vec<DependencyDocument>,
}

#[derive( Debug, Serialize, Deserialize )]
#[serde( rename_all = "camelCase" )]
struct DependencyDocument {
	unique_name: String,
	#[serde( default, skip_serializing_if = "Option::is_none" )]
	version: Option<String>,
	#[serde( default = "required_by_default" )]
	required: bool,
}

const fn required_by_default() -> bool { true }

impl TryFrom<ManifestDocument> for Manifest {
	type Error = ManifestError ;

	fn try_from( document: ManifestDocument ) -> Result<Self, Self::Error> {

		if document.unique_name.trim().is_empty() { return Err( ManifestError::EmptyName )}

		let mut seen = BTreeSet::new();
		let dependencies = document.dependencies.into_iter()
			.map(| dependency | {
				if !seen.insert( dependency.unique_name.clone() ) {
					return Err( ManifestError::DuplicateDependency( dependency.unique_name ));
				}
				Ok( Dependency {
					min_version: dependency.version.as_deref().map( parse_version ).transpose()?,
					unique_name: dependency.unique_name,
					required: dependency.required,
				})
			})
			.collect::<Result<BTreeSet<_>, _>>()?;

		Ok( Manifest {
			version: parse_version( &document.version )?,
			unique_name: document.unique_name,
			dependencies,
			load_phase: document.load_phase,
			entry: document.entry,
			symbols: document.symbols,
			subplugins: document.subplugins,
		})

	}
}

impl From<&Manifest> for ManifestDocument {
	fn from( manifest: &Manifest ) -> Self {
		Self {
			unique_name: manifest.unique_name.clone(),
			version: manifest.version.to_string(),
			dependencies: manifest.dependencies.iter().map(| dependency | DependencyDocument {
				unique_name: dependency.unique_name.clone(),
				version: dependency.min_version.as_ref().map( ToString::to_string ),
				required: dependency.required,
			}).collect(),
			load_phase: manifest.load_phase,
			entry: manifest.entry.clone(),
			symbols: manifest.symbols.clone(),
			subplugins: manifest.subplugins.clone(),
		}
	}
}
