//! A package loader for WebAssembly component plugins.
//!
//! Plugins are distributed as **packages**: a directory or tar archive holding a manifest
//! and the plugin's content. `wasm_plugin_loader` discovers packages, orders them by their
//! declared dependencies and turns each one into a constructed **extension**: the instance
//! of the contract interface the plugin's component exports.
//!
//! # Pipeline
//!
//! - **Resolution** ([`PackageResolver`]): lazily produces candidate packages. Producers read
//! 	manifests from directories and archives; decorators expand subplugins, validate,
//! 	deduplicate, prioritise and rewrite package content. Per-candidate failures are part of
//! 	the stream, never fatal.
//!
//! - **Dependency resolution** ([`DependencyResolver`]): splits manifests into [`LoadStep`]s
//! 	so that every package loads after its dependencies, and explains every manifest that
//! 	cannot be placed ([`UnresolvableReason`]). [`MultiPhaseResolver`] adds coarse
//! 	[`LoadPhase`]s on top.
//!
//! - **Loading** ([`PluginLoader`]): loaders compose ([`ExtendableLoader`],
//! 	[`ConditionalLoader`], [`NarrowingLoader`], [`ValidatingLoader`]) around the
//! 	[`ComponentLoader`], which compiles the component in the package's own
//! 	[`IsolationUnit`], finds the contract interface and calls its constructor with
//! 	injected arguments ([`InjectorChain`]).
//!
//! - **Hosting** ([`PluginHost`]): runs all of the above and reports the fate of every
//! 	package in a [`LoadReport`].
//!
//! Code can be rewritten before compilation by a [`CodeEditor`]; [`CachingCodeEditor`] keeps
//! the results on disk. [`HookPoint`]s let plugins intercept host operations.
//!
//! # Re-exports
//!
//! `wasm_plugin_loader` re-exports a small set of types from `wasmtime` for convenience
//! (`Engine`, `Component`, `Linker`, `ResourceTable`, `Val`). These types are
//! defined by wasmtime; see the [wasmtime docs](https://docs.rs/wasmtime/latest/wasmtime/)
//! for details.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc ;
//! use wasm_plugin_loader::{
//! 	PluginHost, ComponentLoader, NarrowingLoader, DefaultContext, MultiPhaseResolver,
//! 	TopologicalResolver, RecursiveResolver, TomlManifestSerializer, Engine, Linker, Val,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // A package is a directory with a manifest and a component.
//! let plugins = tempfile::tempdir()?;
//! let greeter = plugins.path().join( "greeter" );
//! std::fs::create_dir( &greeter )?;
//! std::fs::write( greeter.join( "manifest.toml" ), r#"
//! 	uniqueName = "acme.greeter"
//! 	version = "1.0"
//! 	entry = "plugin.wat"
//! "# )?;
//! std::fs::write( greeter.join( "plugin.wat" ), r#"(component
//! 	(core module $m (func (export "answer") (result i32) i32.const 42))
//! 	(core instance $i (instantiate $m))
//! 	(func $answer (result u32) (canon lift (core func $i "answer")))
//! 	(instance $inst (export "answer" (func $answer)))
//! 	(export "acme:greeter/extension" (instance $inst))
//! )"# )?;
//!
//! // Host functions plugins may import go into the linker.
//! let engine = Engine::default();
//! let loader = NarrowingLoader::components( ComponentLoader::<DefaultContext>::new( &engine, Linker::new( &engine )));
//! let host = PluginHost::new( loader, MultiPhaseResolver::by_load_phase( TopologicalResolver ));
//!
//! let resolver = RecursiveResolver::new( plugins.path(), "manifest.toml", Arc::new( TomlManifestSerializer ));
//! let report = host.load_all( &resolver, &[] );
//! assert!( report.is_clean() );
//!
//! let greeter = report.plugin( "acme.greeter" ).ok_or( "not loaded" )?;
//! assert!( matches!( greeter.call( "answer", &[] )?[..], [ Val::U32( 42 )]));
//! # Ok(())
//! # }
//! ```

mod utils ;
mod manifest ;
mod package ;
mod resolution ;
mod dependency ;
mod isolation ;
mod extension ;
mod editor ;
mod loader ;
mod hooks ;
mod host ;
mod config ;

#[doc( no_inline )]
pub use wasmtime::Engine ;
#[doc( no_inline )]
pub use wasmtime::component::{ Component, Linker, ResourceTable, Val };

pub use utils::PartialSuccess ;
pub use manifest::{
	Manifest, Dependency, LoadPhase, ManifestError, parse_version,
	ManifestSerializer, TomlManifestSerializer, JsonManifestSerializer,
};
pub use package::{
	PluginPackage, PackageId, PackageStorage, DirectoryStorage, ArchiveStorage, NestedStorage,
	CaseInsensitiveStorage, copy_to_directory, normalise_path,
};
pub use resolution::{
	PackageResolver, PackageStream, ResolveOutcome, ResolvedPackage, ResolutionError, resolve_all,
	DirectoryResolver, ArchiveResolver, RecursiveResolver, SubpluginResolver, ValidatingResolver,
	DistinctResolver, PrioritizingResolver, RewritingResolver, CompositeResolver,
};
pub use dependency::{
	DependencyResolver, TopologicalResolver, MultiPhaseResolver, LoadStep, ResolveResult, UnresolvableReason,
};
pub use isolation::{ PluginContext, DefaultContext, IsolationUnit, ContextHandle, ContextProvider };
pub use extension::{ ExtensionInstance, DispatchError };
pub use editor::{ CodeEditor, EditOutput, EditError, CachingCodeEditor, CacheStats };
pub use loader::{
	PluginLoader, CanLoad, LoadSuccess, LoadError,
	ExtendableLoader, ConditionalLoader, NarrowingLoader, ValidatingLoader,
	ComponentLoader, ComponentManifest,
	InjectionRequest, ParameterInjector, InjectorRegistry, InjectorChain,
	ConstructorSignature, ParameterSignature, SelectedConstructor, InjectionFailure, select_constructor,
};
pub use hooks::{ HookPoint, HookFlow, HookError, Interceptor };
pub use host::{ PluginHost, LoadReport, LoadedPlugin, FailedPlugin, PackageState };
pub use config::{ LoaderConfig, ManifestFormat, ConfigError };
