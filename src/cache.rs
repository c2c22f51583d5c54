//! Everything we keep between runs: connection contexts, which one is current, and saved
//! selections.
//!
//! To use the cache system, implement the Cacheable and CacheKey traits, then you can
//! use the read() and write() functions.
use crate::context::{Context, ContextName};
use crate::saved::{SavedSelection, SelectionName};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// You need a cache key in order to read something for cache. Using a dedicated type instead of
/// a plain string ties each key type to the data it reads, see [`Cacheable`].
pub trait CacheKey {
    fn as_path(&self) -> String;
}

/// Anything that can be cached needs to implement this trait.
///
/// Cacheable has an associated type so that can always pair up a struct to be cached with its
/// cache key. Reading a [`Context`] with a [`SelectionName`] key won't compile.
pub trait Cacheable {
    type CacheKey;

    fn cache_key(&self) -> Self::CacheKey;

    /// All structs of the same type get saved in the same folder, named after the type id. Type
    /// ids should be unique.
    fn type_id() -> &'static str;
}

pub fn read<D, K>(cache_key: &K) -> Result<D, crate::Error>
where
    D: Cacheable<CacheKey = K> + DeserializeOwned,
    K: CacheKey,
{
    read_in(&cache_root()?, cache_key)
}

pub fn write<D, K>(data: &D) -> Result<(), crate::Error>
where
    D: Cacheable<CacheKey = K> + Serialize,
    K: CacheKey,
{
    write_in(&cache_root()?, data)
}

/// Reads every cached instance of `D`, sorted by file name.
pub fn read_all<D>() -> Result<Vec<D>, crate::Error>
where
    D: Cacheable + DeserializeOwned,
{
    read_all_in(&cache_root()?)
}

pub fn exists<D, K>(cache_key: &K) -> Result<bool, crate::Error>
where
    D: Cacheable<CacheKey = K>,
    K: CacheKey,
{
    let file_location = get_cache_path(&cache_root()?, D::type_id(), cache_key)?;

    Ok(file_location.is_file())
}

fn read_in<D, K>(root: &Path, cache_key: &K) -> Result<D, crate::Error>
where
    D: Cacheable<CacheKey = K> + DeserializeOwned,
    K: CacheKey,
{
    let file_location = get_cache_path(root, D::type_id(), cache_key)?;

    debug!("reading {}", file_location.display());

    let data = serde_json::from_reader(fs::File::open(file_location)?)?;

    Ok(data)
}

fn write_in<D, K>(root: &Path, data: &D) -> Result<(), crate::Error>
where
    D: Cacheable<CacheKey = K> + Serialize,
    K: CacheKey,
{
    let file_location = get_cache_path(root, D::type_id(), &data.cache_key())?;

    debug!("writing {}", file_location.display());

    let data = serde_json::to_string_pretty(&data)?;

    fs::write(file_location, data)?;

    Ok(())
}

fn read_all_in<D>(root: &Path) -> Result<Vec<D>, crate::Error>
where
    D: Cacheable + DeserializeOwned,
{
    let folder = require_cache_folder(root, D::type_id())?;

    let mut files: Vec<PathBuf> = fs::read_dir(folder)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<_, _>>()?;
    files.sort();

    files
        .into_iter()
        .filter(|path| path.extension().is_some_and(|extension| extension == "json"))
        .map(|path| Ok(serde_json::from_reader(fs::File::open(path)?)?))
        .collect()
}

fn get_cache_path<K: CacheKey>(
    root: &Path,
    type_id: &'static str,
    cache_key: &K,
) -> Result<PathBuf, crate::Error> {
    let mut location = require_cache_folder(root, type_id)?;

    location.push(cache_key.as_path());

    Ok(location)
}

fn cache_root() -> Result<PathBuf, crate::Error> {
    let home = std::env::var("HOME")?;

    let mut path = PathBuf::from(home);
    path.push(".cache");
    path.push("agri-query");
    path.push("cache");
    path.push("v1");

    Ok(path)
}

fn require_cache_folder(root: &Path, type_id: &'static str) -> Result<PathBuf, crate::Error> {
    let path = root.join(type_id);

    // we have to make sure it exists, right?
    fs::create_dir_all(&path)?;

    Ok(path)
}

// Please dump all impls here, so we keep the rest of the code base clean.

impl Cacheable for Context {
    type CacheKey = ContextName;

    fn cache_key(&self) -> Self::CacheKey {
        self.name.clone()
    }

    fn type_id() -> &'static str {
        "context"
    }
}

impl CacheKey for ContextName {
    fn as_path(&self) -> String {
        format!("context_{}.json", self)
    }
}

impl Cacheable for ContextName {
    type CacheKey = SharedCacheKey;

    fn cache_key(&self) -> Self::CacheKey {
        SharedCacheKey(Self::type_id().to_owned())
    }

    fn type_id() -> &'static str {
        "current_context"
    }
}

impl Cacheable for SavedSelection {
    type CacheKey = SelectionName;

    fn cache_key(&self) -> Self::CacheKey {
        self.name.clone()
    }

    fn type_id() -> &'static str {
        "selection"
    }
}

impl CacheKey for SelectionName {
    fn as_path(&self) -> String {
        format!("selection_{}.json", self)
    }
}

/// Key for things there is only one of.
pub struct SharedCacheKey(String);

impl CacheKey for SharedCacheKey {
    fn as_path(&self) -> String {
        self.0.clone()
    }
}
