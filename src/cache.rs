use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use sha2::{Digest, Sha256};

use crate::{
    compiler::{CompileOptions, compile_with},
    error::CurlyResult,
    presenter::PresenterType,
    program::Program,
};

/// `(sha256 of the source, presenter type identity)`.
type CacheKey = (Vec<u8>, usize);

/// A read-through cache of compiled programs, shareable between threads.
///
/// Compilation happens outside the lock. Two threads racing on the same key
/// may both compile, but only the first finished program is kept and both
/// receive it.
#[derive(Debug, Default)]
pub struct ProgramCache {
    options: CompileOptions,
    programs: RwLock<HashMap<CacheKey, Arc<Program>>>,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            options,
            programs: RwLock::default(),
        }
    }

    fn key(source: &str, presenter: &dyn PresenterType) -> CacheKey {
        (
            Sha256::digest(source.as_bytes()).to_vec(),
            presenter.identity(),
        )
    }

    /// Returns the cached program for `source` and `presenter`, compiling it
    /// on a miss. Failed compiles are not cached.
    ///
    /// # Errors
    /// Whatever compiling `source` fails with.
    pub fn get_or_compile(
        &self,
        source: &str,
        presenter: &Arc<dyn PresenterType>,
    ) -> CurlyResult<Arc<Program>> {
        let key = Self::key(source, presenter.as_ref());

        let cached = self
            .programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(program) = cached {
            log::trace!("program cache hit for `{}`", presenter.name());
            return Ok(program);
        }

        log::debug!("program cache miss for `{}`", presenter.name());
        let program = Arc::new(compile_with(source, presenter, &self.options)?);

        let mut programs = self
            .programs
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(programs.entry(key).or_insert(program)))
    }

    pub fn len(&self) -> usize {
        self.programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.programs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
