use semver::Version ;

use super::ManifestError ;



/// Parses a `major.minor[.patch][-prerelease][+build]` version.
///
/// Manifests in the wild routinely omit the patch component, which strict semver
/// rejects; a missing patch is read as `0`.
///
/// # Errors
/// Returns [`ManifestError::InvalidVersion`] if the core has fewer than two or more
/// than three components, or if any part fails semver validation.
///
/// ```
/// use wasm_plugin_loader::parse_version ;
///
/// assert_eq!( parse_version( "1.4" ).unwrap(), semver::Version::new( 1, 4, 0 ));
/// assert_eq!( parse_version( "2.0-beta.1" ).unwrap().pre.as_str(), "beta.1" );
/// assert!( parse_version( "7" ).is_err() );
/// ```
pub fn parse_version( version: &str ) -> Result<Version, ManifestError> {

	let invalid = | reason: &str | ManifestError::InvalidVersion {
		version: version.to_string(),
		reason: reason.to_string(),
	};

	let trimmed = version.trim();
	let split_at = trimmed.find([ '-', '+' ]).unwrap_or( trimmed.len() );
	let ( core, suffix ) = trimmed.split_at( split_at );

	let normalised = match core.split( '.' ).count() {
		2 => format!( "{}.0{}", core, suffix ),
		3 => trimmed.to_string(),
		_ => return Err( invalid( "expected major.minor[.patch]" )),
	};

	Version::parse( &normalised ).map_err(| err | invalid( &err.to_string() ))

}

#[cfg( test )]
mod tests {
	use super::* ;

	#[test]
	fn pads_missing_patch_before_prerelease() {
		let version = parse_version( "1.0-rc.2+build.5" ).unwrap();
		assert_eq!(( version.major, version.minor, version.patch ), ( 1, 0, 0 ));
		assert_eq!( version.pre.as_str(), "rc.2" );
		assert_eq!( version.build.as_str(), "build.5" );
	}

	#[test]
	fn rejects_malformed_cores() {
		for input in [ "", "1", "1.2.3.4", "a.b", "1..2" ] {
			assert!( parse_version( input ).is_err(), "accepted {:?}", input );
		}
	}
}
