use std::path::PathBuf ;
use std::sync::Arc ;

use crate::package::{ CaseInsensitiveStorage, PluginPackage, copy_to_directory };
use super::{ PackageResolver, PackageStream, ResolutionError, describe };



type Rewrite = Box<dyn Fn( PluginPackage ) -> Result<PluginPackage, ResolutionError> + Send + Sync> ;

/// Replaces the content of every package with a rewritten view.
///
/// Package identity and manifest are kept; only the storage changes. Two rewrites are
/// provided: [`case_insensitive`]( Self::case_insensitive ) and [`staged`]( Self::staged ).
pub struct RewritingResolver<R> {
	inner: R,
	rewrite: Rewrite,
}

impl<R: PackageResolver> RewritingResolver<R> {

	pub fn new(
		inner: R,
		rewrite: impl Fn( PluginPackage ) -> Result<PluginPackage, ResolutionError> + Send + Sync + 'static,
	) -> Self {
		Self { inner, rewrite: Box::new( rewrite ) }
	}

	/// Serves content lookups ignoring ASCII case, preferring exact matches.
	pub fn case_insensitive( inner: R ) -> Self {
		Self::new( inner, | package | {
			let storage = CaseInsensitiveStorage::new( Arc::clone( package.storage() ))
				.map_err(| source | ResolutionError::Staging { package: describe( &package ), source })?;
			Ok( package.with_storage( Arc::new( storage )))
		})
	}

	/// Copies the content of each package into its own directory under `directory` and
	/// serves it from there.
	///
	/// An existing copy at the same location is replaced.
	pub fn staged( inner: R, directory: impl Into<PathBuf> ) -> Self {
		let directory = directory.into();
		Self::new( inner, move | package | {
			let target = directory.join( staging_name( &package ));
			let staging_error = | source: std::io::Error | ResolutionError::Staging { package: describe( &package ), source };
			if target.parent() != Some( directory.as_path() ) {
				return Err( staging_error( std::io::Error::new( std::io::ErrorKind::InvalidInput, "staging target escapes the staging directory" )));
			}
			if target.exists() { std::fs::remove_dir_all( &target ).map_err( staging_error )?; }
			let storage = copy_to_directory( package.storage().as_ref(), &target ).map_err( staging_error )?;
			tracing::debug!( package = %package.manifest(), target = %target.display(), "Staged package content" );
			Ok( package.with_storage( Arc::new( storage )))
		})
	}

}

/// A single path component naming the staged copy of `package`.
fn staging_name( package: &PluginPackage ) -> String {
	let name = package.manifest().unique_name().chars()
		.map(| c | match c.is_ascii_alphanumeric() || matches!( c, '-' | '_' | '.' ) {
			true => c,
			false => '_',
		})
		.collect::<String>();
	format!( "{}-{}-{}", name, package.manifest().version(), package.id().to_string().trim_start_matches( '#' ))
}

impl<R: PackageResolver> PackageResolver for RewritingResolver<R> {
	fn resolve_packages( &self ) -> PackageStream<'_> {
		Box::new( self.inner.resolve_packages().map(| outcome | {
			let mut resolved = outcome?;
			resolved.package = ( self.rewrite )( resolved.package )?;
			Ok( resolved )
		}))
	}
}
