//! Rewriting plugin code before it is compiled.
//!
//! A [`CodeEditor`] receives the raw entry bytes of a package (and its optional symbol file)
//! and returns the code that is actually compiled. Editors are configured by the host;
//! [`CachingCodeEditor`] wraps any editor with an on-disk cache keyed by content hash.

mod cache ;

pub use cache::{ CachingCodeEditor, CacheStats };

use std::path::PathBuf ;
use std::sync::Arc ;
use thiserror::Error ;



/// Errors raised while editing code.
#[derive( Debug, Error )]
pub enum EditError {
	/// The editor itself refused or failed to process the input.
	#[error( "Editor '{editor}' failed on {name}: {message}" )]
	Failed { editor: String, name: String, message: String },
	/// The cache directory could not be read or written.
	#[error( "Cache I/O failure at {path}: {source}" )]
	Cache { path: PathBuf, source: std::io::Error },
	/// A cache record could not be (de)serialized.
	#[error( "Corrupt cache record {path}: {source}" )]
	Record { path: PathBuf, source: serde_json::Error },
}

/// The result of an edit.
#[derive( Clone, Debug, Default, PartialEq, Eq )]
pub struct EditOutput {
	pub code: Vec<u8>,
	pub symbols: Option<Vec<u8>>,
	/// Diagnostics produced by the editor, surfaced as load warnings.
	pub messages: Vec<String>,
}

impl EditOutput {
	pub fn unchanged( code: &[u8], symbols: Option<&[u8]> ) -> Self {
		Self { code: code.to_vec(), symbols: symbols.map( <[u8]>::to_vec ), messages: Vec::with_capacity( 0 ) }
	}
}

/// Transforms plugin code before compilation.
pub trait CodeEditor: Send + Sync {

	/// Identifies the editor and its configuration.
	///
	/// Any change in behaviour must change the descriptor: cached results produced under a
	/// different descriptor are discarded.
	fn descriptor( &self ) -> String ;

	/// Edits the code of the package called `name`.
	///
	/// # Errors
	/// Implementations report failures as [`EditError::Failed`].
	fn edit( &self, name: &str, code: &[u8], symbols: Option<&[u8]> ) -> Result<EditOutput, EditError> ;

}

impl<E: CodeEditor + ?Sized> CodeEditor for Arc<E> {
	fn descriptor( &self ) -> String { ( **self ).descriptor() }
	fn edit( &self, name: &str, code: &[u8], symbols: Option<&[u8]> ) -> Result<EditOutput, EditError> {
		( **self ).edit( name, code, symbols )
	}
}

impl<E: CodeEditor + ?Sized> CodeEditor for Box<E> {
	fn descriptor( &self ) -> String { ( **self ).descriptor() }
	fn edit( &self, name: &str, code: &[u8], symbols: Option<&[u8]> ) -> Result<EditOutput, EditError> {
		( **self ).edit( name, code, symbols )
	}
}
