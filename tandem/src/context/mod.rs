//! The seam between the dispatcher and the platform graphics API.
//!
//! A [`WindowSystem`] hands out [`GraphicsContext`]s. Each worker owns one
//! context, makes it current on its own thread and talks to the GPU through
//! the context's [`GraphicsDevice`]. Contexts created with a `share_with`
//! partner see the same objects, which is how buffers generated on the
//! resource thread become drawable on the rendering thread.

mod device;
pub mod headless;

pub use device::*;

use itertools::Itertools;
use snafu::{OptionExt, Snafu};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use tracing::debug;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub))]
pub enum ContextError {
    #[snafu(display("Failed to create the {label} context: {reason}"))]
    CreateContext { label: String, reason: String },

    #[snafu(display("Failed to make the {label} context current: {reason}"))]
    MakeCurrent { label: String, reason: String },

    #[snafu(display("The graphics driver doesn't provide {name}"))]
    MissingEntryPoint { name: &'static str },
}

/// Address of a resolved API function.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryPoint(NonZeroUsize);

impl EntryPoint {
    pub fn from_addr(addr: usize) -> Option<Self> {
        NonZeroUsize::new(addr).map(Self)
    }

    pub fn addr(self) -> usize {
        self.0.get()
    }
}

pub trait EntryPointResolver {
    fn resolve(&self, name: &str) -> Option<EntryPoint>;
}

pub trait GraphicsContext: EntryPointResolver + Send {
    fn label(&self) -> &str;

    /// Binds the context to the calling thread.
    fn make_current(&mut self) -> Result<(), ContextError>;

    fn device(&mut self) -> &mut dyn GraphicsDevice;
}

pub trait WindowSystem: Send + Sync {
    fn create_context(
        &self,
        label: &str,
        share_with: Option<&dyn GraphicsContext>,
    ) -> Result<Box<dyn GraphicsContext>, ContextError>;

    /// Presents the back buffer of the window.
    fn swap_buffers(&self);
}

pub const REQUIRED_ENTRY_POINTS: &[&str] = &[
    "glGenBuffers",
    "glDeleteBuffers",
    "glBindBuffer",
    "glBufferData",
    "glGenVertexArrays",
    "glDeleteVertexArrays",
    "glBindVertexArray",
    "glEnableVertexAttribArray",
    "glVertexAttribPointer",
    "glCreateShader",
    "glDeleteShader",
    "glShaderSource",
    "glCompileShader",
    "glGetShaderiv",
    "glGetShaderInfoLog",
    "glCreateProgram",
    "glDeleteProgram",
    "glAttachShader",
    "glBindAttribLocation",
    "glLinkProgram",
    "glGetProgramiv",
    "glGetProgramInfoLog",
    "glUseProgram",
    "glGetUniformLocation",
    "glUniform1fv",
    "glUniform2fv",
    "glUniform3fv",
    "glUniform4fv",
    "glUniformMatrix3fv",
    "glUniformMatrix4fv",
    "glDrawArrays",
    "glDrawElements",
    "glClear",
    "glGetError",
];

/// Extensions used when present.
pub const OPTIONAL_ENTRY_POINTS: &[&str] = &["glMapBuffer", "glUnmapBuffer"];

/// Function table of a context. Loaded once per context, on first use.
#[derive(Debug, Clone)]
pub struct EntryPointTable {
    entries: HashMap<&'static str, EntryPoint>,
}

impl EntryPointTable {
    pub fn load<R: EntryPointResolver + ?Sized>(resolver: &R) -> Result<Self, ContextError> {
        let mut entries = HashMap::with_capacity(
            REQUIRED_ENTRY_POINTS.len() + OPTIONAL_ENTRY_POINTS.len(),
        );

        for &name in REQUIRED_ENTRY_POINTS {
            let entry = resolver
                .resolve(name)
                .context(MissingEntryPointErr { name })?;
            entries.insert(name, entry);
        }

        let mut unavailable = Vec::new();
        for &name in OPTIONAL_ENTRY_POINTS {
            match resolver.resolve(name) {
                Some(entry) => {
                    entries.insert(name, entry);
                }
                None => unavailable.push(name),
            }
        }
        if !unavailable.is_empty() {
            debug!("Optional entry points not available: {}", unavailable.iter().join(", "));
        }

        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<EntryPoint> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether uploads can go through a mapped buffer instead of a copy.
    pub fn supports_buffer_mapping(&self) -> bool {
        self.entries.contains_key("glMapBuffer") && self.entries.contains_key("glUnmapBuffer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Resolver {
        skip: &'static [&'static str],
    }

    impl EntryPointResolver for Resolver {
        fn resolve(&self, name: &str) -> Option<EntryPoint> {
            if self.skip.iter().any(|skipped| *skipped == name) {
                None
            } else {
                EntryPoint::from_addr(0x1000 + name.len())
            }
        }
    }

    #[test]
    fn loads_all_entry_points() {
        let table = EntryPointTable::load(&Resolver { skip: &[] }).unwrap();
        assert_eq!(
            table.len(),
            REQUIRED_ENTRY_POINTS.len() + OPTIONAL_ENTRY_POINTS.len()
        );
        assert!(table.supports_buffer_mapping());
        assert!(table.get("glDrawElements").is_some());
    }

    #[test]
    fn missing_optional_entry_points_are_tolerated() {
        let table = EntryPointTable::load(&Resolver {
            skip: &["glMapBuffer"],
        })
        .unwrap();
        assert!(!table.supports_buffer_mapping());
    }

    #[test]
    fn missing_required_entry_point_fails() {
        let err = EntryPointTable::load(&Resolver {
            skip: &["glLinkProgram"],
        })
        .unwrap_err();
        assert!(matches!(
            err,
            ContextError::MissingEntryPoint {
                name: "glLinkProgram"
            }
        ));
    }
}
