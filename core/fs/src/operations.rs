//! Filesystem verbs.
//!
//! Every verb binds its descriptors to a repository first (unknown or absent
//! repository names fall back to the default), then talks to that
//! repository's metadata store and the shared chunking engine.
//!
//! Particle batches never abort early. A failed batch surfaces as
//! `Error::PartialFailure` carrying the complete status map; nothing already
//! written is rolled back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::{join_all, BoxFuture, FutureExt};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ionfs_common::{
    Error, ObjectDescriptor, ObjectMetadata, Result, SearchResult, StatusMap, Tag, STATUS_OK,
};
use ionfs_crypto::{content_hash, decode_iv, decrypt, encode_iv, encrypt, generate_iv, CryptoKey};
use ionfs_metadata::create_default_registry;
use ionfs_particle::{
    chunk_count, effective_max_size, split, BurstEngine, ParticleStore, DEFAULT_CONCURRENCY,
    DELETE_TIMEOUT, HARD_MAX_SIZE,
};

use crate::address::AddressResolver;
use crate::config::Settings;
use crate::repository::{Repository, RepositoryRegistry};

/// Defaults applied to every verb.
#[derive(Debug, Clone)]
pub struct FsOptions {
    /// Particle size ceiling in bytes.
    pub max_size: usize,
    pub use_manifest: bool,
    /// Require a key for every upload.
    pub encrypt: bool,
    pub classification: Option<String>,
    pub concurrency: usize,
}

impl Default for FsOptions {
    fn default() -> Self {
        Self {
            max_size: HARD_MAX_SIZE,
            use_manifest: false,
            encrypt: false,
            classification: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl FsOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_size: settings.max_size(),
            use_manifest: settings.use_manifest,
            encrypt: settings.encrypt,
            classification: settings.default_classification.clone(),
            concurrency: settings.concurrency,
        }
    }
}

/// Per-call options for uploads.
///
/// `key` is also used to decrypt when a move or copy downloads.
#[derive(Debug, Default)]
pub struct PutOptions {
    /// Name to store under when the target is a folder.
    pub name: Option<String>,
    pub classification: Option<String>,
    pub key: Option<CryptoKey>,
    /// Overrides the configured particle size.
    pub max_size: Option<usize>,
    /// Overrides the configured manifest mode.
    pub manifest: Option<bool>,
    pub tags: Vec<Tag>,
}

/// Outcome of a completed upload or download.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub metadata: ObjectMetadata,
    pub statuses: StatusMap,
}

/// The filesystem.
pub struct IonFs {
    repositories: RepositoryRegistry,
    engine: BurstEngine,
    options: FsOptions,
}

impl IonFs {
    pub fn new(
        repositories: RepositoryRegistry,
        particles: Arc<dyn ParticleStore>,
        options: FsOptions,
    ) -> Self {
        let engine = BurstEngine::new(particles, options.concurrency);
        Self {
            repositories,
            engine,
            options,
        }
    }

    /// Build the filesystem from settings.
    ///
    /// # Errors
    /// - Settings invalid
    /// - A repository class is unknown or its backend cannot be opened
    /// - The particle store cannot be configured
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let stores = create_default_registry()?;
        let repositories = RepositoryRegistry::from_settings(settings, &stores)?;
        let particles = settings.particles.build()?;
        info!(particles = %particles.name(), "IonFS initialized");
        Ok(Self::new(
            repositories,
            particles,
            FsOptions::from_settings(settings),
        ))
    }

    pub fn resolver(&self) -> AddressResolver<'_> {
        AddressResolver::new(&self.repositories)
    }

    /// Configured repositories, in configuration order.
    pub fn repositories(&self) -> impl Iterator<Item = &Repository> {
        self.repositories.iter()
    }

    pub fn registry(&self) -> &RepositoryRegistry {
        &self.repositories
    }

    pub fn options(&self) -> &FsOptions {
        &self.options
    }

    /// Check the particle service answers.
    pub async fn check(&self) -> Result<bool> {
        self.engine.store().check().await
    }

    pub async fn exists(&self, target: &ObjectDescriptor) -> Result<bool> {
        let (target, repo) = self.repositories.bind(target);
        repo.store().exists(&target).await
    }

    /// List a folder, sorted by full name and tagged with its repository.
    pub async fn list(
        &self,
        folder: &ObjectDescriptor,
        recursive: bool,
    ) -> Result<Vec<ObjectDescriptor>> {
        let (folder, repo) = self.repositories.bind(folder);
        let mut items = repo.store().list(&folder, recursive).await?;
        for item in &mut items {
            Self::tag(item, repo);
        }
        items.sort();
        Ok(items)
    }

    /// Create a folder.
    ///
    /// # Errors
    /// - `AlreadyExists` if the folder exists
    pub async fn make_dir(&self, folder: &ObjectDescriptor) -> Result<()> {
        if !folder.is_folder {
            return Err(Error::InvalidInput(format!("'{}' is not a folder", folder)));
        }
        let (folder, repo) = self.repositories.bind(folder);
        repo.store().make_dir(&folder).await?;
        info!(folder = %folder, "Folder created");
        Ok(())
    }

    /// Delete a folder.
    ///
    /// A non-empty folder needs `recursive`: files go first (in parallel),
    /// then subfolders (in parallel), then the folder's own marker. The
    /// marker stays when anything inside could not be removed, and the root
    /// has no marker to remove.
    ///
    /// # Errors
    /// - `NotFound` if the folder does not exist
    /// - `NotEmpty` if it has entries and `recursive` is not set
    /// - `PartialFailure` with the merged status map of failed particle deletes
    pub fn delete_dir<'a>(
        &'a self,
        folder: &'a ObjectDescriptor,
        recursive: bool,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if !folder.is_folder {
                return Err(Error::InvalidInput(format!("'{}' is not a folder", folder)));
            }
            let (folder, repo) = self.repositories.bind(folder);
            let store = repo.store();

            if !store.exists(&folder).await? {
                return Err(Error::NotFound(format!("Folder {} doesn't exist", folder)));
            }

            let entries = store.list(&folder, false).await?;
            if !entries.is_empty() && !recursive {
                return Err(Error::NotEmpty(folder.to_string()));
            }

            let (folders, files): (Vec<_>, Vec<_>) = entries
                .into_iter()
                .map(|mut entry| {
                    Self::tag(&mut entry, repo);
                    entry
                })
                .partition(|entry| entry.is_folder);

            let mut statuses = StatusMap::new();
            let mut first_error = None;

            for result in join_all(files.iter().map(|file| self.delete(file))).await {
                Self::collect(result, &mut statuses, &mut first_error);
            }
            for result in join_all(folders.iter().map(|sub| self.delete_dir(sub, true))).await {
                Self::collect(result.map(|_| StatusMap::new()), &mut statuses, &mut first_error);
            }

            if let Some(e) = first_error {
                return Err(e);
            }
            if !statuses.all_ok() {
                warn!(folder = %folder, failed = statuses.failures().count(), "Folder not removed");
                return Err(Error::PartialFailure(statuses));
            }

            if !folder.is_root {
                store.del_metadata(&folder).await?;
            }
            info!(folder = %folder, "Folder removed");
            Ok(())
        }
        .boxed()
    }

    fn collect(result: Result<StatusMap>, statuses: &mut StatusMap, first_error: &mut Option<Error>) {
        match result {
            Ok(map) => statuses.merge(map),
            Err(Error::PartialFailure(map)) => statuses.merge(map),
            Err(e) => {
                if first_error.is_none() {
                    *first_error = Some(e);
                }
            }
        }
    }

    /// Upload a local file.
    ///
    /// # Preconditions
    /// - `source` is a local file
    /// - `target` is a remote file, or a folder to store the file in under
    ///   `options.name` or the source's name
    ///
    /// # Postconditions
    /// - Metadata is written only when every particle was stored
    ///
    /// # Errors
    /// - `Unsupported` if `source` is remote
    /// - `AlreadyExists` if the target exists
    /// - `KeyRequired` if encryption is mandatory and no key was given
    /// - `PartialFailure` if any particle upload failed; stored particles are
    ///   left behind
    pub async fn put(
        &self,
        source: &ObjectDescriptor,
        target: &ObjectDescriptor,
        options: &PutOptions,
    ) -> Result<Transfer> {
        if source.is_remote {
            return Err(Error::Unsupported(
                "source cannot be a remote object".to_string(),
            ));
        }
        if source.is_folder {
            return Err(Error::InvalidInput(format!("'{}' is not a file", source)));
        }

        let path = source.full_name();
        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.clone())
            } else {
                Error::Io(e)
            }
        })?;

        let name = options.name.as_deref().unwrap_or(&source.name);
        self.upload(Bytes::from(data), name, target, options, false)
            .await
    }

    /// Upload an in-memory text value. Manifest mode is never used.
    ///
    /// # Errors
    /// - `InvalidInput` if `target` is a folder and no name was given
    pub async fn put_text(
        &self,
        text: &str,
        target: &ObjectDescriptor,
        options: &PutOptions,
    ) -> Result<Transfer> {
        let name = match (&options.name, target.is_folder) {
            (Some(name), _) => name.clone(),
            (None, false) => target.name.clone(),
            (None, true) => {
                return Err(Error::InvalidInput(
                    "a name is required to store text in a folder".to_string(),
                ))
            }
        };
        self.upload(Bytes::copy_from_slice(text.as_bytes()), &name, target, options, true)
            .await
    }

    async fn upload(
        &self,
        payload: Bytes,
        name: &str,
        target: &ObjectDescriptor,
        options: &PutOptions,
        is_text: bool,
    ) -> Result<Transfer> {
        let target = if target.is_folder {
            target.child_file(name)
        } else {
            target.clone()
        };
        let (target, repo) = self.repositories.bind(&target);
        if target.name.is_empty() {
            return Err(Error::InvalidInput("target has no file name".to_string()));
        }

        if repo.store().exists(&target).await? {
            return Err(Error::AlreadyExists(format!("Target file {} exists", target)));
        }
        if options.key.is_none() && self.options.encrypt {
            return Err(Error::KeyRequired);
        }

        let size = payload.len() as u64;
        let hash = content_hash(&payload);
        debug!(object = %target, size, hash = %hash, "Prepared payload");

        let (payload, iv) = match &options.key {
            Some(key) => {
                let iv = generate_iv();
                let ciphertext = encrypt(key, &iv, &payload);
                (Bytes::from(ciphertext), Some(encode_iv(&iv)))
            }
            None => (payload, None),
        };

        let max_size = effective_max_size(options.max_size.unwrap_or(self.options.max_size));
        let classification = options
            .classification
            .as_deref()
            .or(self.options.classification.as_deref());

        let mut manifest = options.manifest.unwrap_or(self.options.use_manifest) && !is_text;
        if manifest && repo.is_secret() {
            warn!(repository = %repo.name(), "Manifest mode is not available for secrets, using native chunking");
            manifest = false;
        }

        let count = chunk_count(payload.len(), max_size);
        let (ids, statuses) = if manifest {
            let id = Uuid::new_v4();
            let statuses = self
                .engine
                .upload_manifest(id, payload, max_size, classification)
                .await;
            (vec![id], statuses)
        } else {
            let bursts = split(&payload, max_size);
            debug!(object = %target, chunks = bursts.len(), max_size, "Split payload");
            let ids = bursts.iter().map(|b| b.id).collect();
            let statuses = self.engine.upload(repo.usage(), bursts, classification).await;
            (ids, statuses)
        };

        if !statuses.all_ok() {
            warn!(
                object = %target,
                failed = statuses.failures().count(),
                total = statuses.len(),
                "Upload incomplete; stored particles are left without metadata"
            );
            return Err(Error::PartialFailure(statuses));
        }

        let metadata = ObjectMetadata {
            id: ids,
            name: target.name.clone(),
            chunk_count: count,
            max_size,
            size,
            hash,
            iv,
            is_manifest: manifest,
            tags: options.tags.clone(),
        };
        repo.store().put_metadata(&metadata, &target).await?;

        info!(object = %target, size, chunks = count, encrypted = metadata.is_encrypted(), "Uploaded");
        Ok(Transfer { metadata, statuses })
    }

    /// Download a remote file to a local path.
    ///
    /// A local folder destination receives the file under its remote name.
    /// Nothing is written unless every particle was fetched and the digest
    /// matches.
    ///
    /// # Errors
    /// - `NoObjects` if the metadata lists no particles
    /// - `KeyRequired` if the object is encrypted and no key was given
    /// - `PartialFailure` if any particle could not be fetched
    /// - `ChecksumMismatch` if the plaintext digest differs from the record
    pub async fn get(
        &self,
        source: &ObjectDescriptor,
        destination: &ObjectDescriptor,
        key: Option<&CryptoKey>,
    ) -> Result<Transfer> {
        if destination.is_remote {
            return Err(Error::InvalidInput(
                "target must be a local file".to_string(),
            ));
        }
        let (metadata, statuses, data) = self.fetch(source, key).await?;

        let path = Self::local_destination(destination, &source.name).await;
        fs::write(&path, &data).await?;

        info!(source = %source, destination = %path.display(), size = data.len(), "Downloaded");
        Ok(Transfer { metadata, statuses })
    }

    /// Download a remote file as text.
    pub async fn get_text(&self, source: &ObjectDescriptor, key: Option<&CryptoKey>) -> Result<String> {
        let (_, _, data) = self.fetch(source, key).await?;
        String::from_utf8(data)
            .map_err(|_| Error::InvalidInput(format!("'{}' is not UTF-8 text", source)))
    }

    async fn fetch(
        &self,
        source: &ObjectDescriptor,
        key: Option<&CryptoKey>,
    ) -> Result<(ObjectMetadata, StatusMap, Vec<u8>)> {
        if source.is_folder {
            return Err(Error::InvalidInput(format!("'{}' is a folder", source)));
        }
        let (source, repo) = self.repositories.bind(source);
        let metadata = repo.store().get_metadata(&source).await?;

        if metadata.id.is_empty() {
            return Err(Error::NoObjects(source.to_string()));
        }
        if metadata.is_encrypted() && key.is_none() {
            return Err(Error::KeyRequired);
        }

        let download = if metadata.is_manifest {
            self.engine.download_manifest(metadata.id[0]).await
        } else {
            self.engine.download(repo.usage(), &metadata.id).await
        };
        let data = match download.data {
            Some(data) if download.statuses.all_ok() => data,
            _ => {
                warn!(source = %source, failed = download.statuses.failures().count(), "Download incomplete");
                return Err(Error::PartialFailure(download.statuses));
            }
        };

        let plaintext = match (&metadata.iv, key) {
            (Some(iv), Some(key)) => decrypt(key, &decode_iv(iv)?, &data)?,
            _ => data.to_vec(),
        };

        let actual = content_hash(&plaintext);
        debug!(source = %source, expected = %metadata.hash, actual = %actual, "Verifying digest");
        if actual != metadata.hash {
            return Err(Error::ChecksumMismatch {
                expected: metadata.hash.clone(),
                actual,
                metadata: Box::new(metadata),
            });
        }

        Ok((metadata, download.statuses, plaintext))
    }

    async fn local_destination(destination: &ObjectDescriptor, name: &str) -> PathBuf {
        let path = PathBuf::from(destination.full_name());
        let is_dir = fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false);
        if destination.is_folder || is_dir {
            path.join(name)
        } else {
            path
        }
    }

    /// Delete a remote file and its particles.
    ///
    /// # Postconditions
    /// - The metadata record is removed only when every particle delete
    ///   succeeded
    ///
    /// # Errors
    /// - `NotFound` if the file has no metadata
    /// - `PartialFailure` if any particle delete failed
    pub async fn delete(&self, file: &ObjectDescriptor) -> Result<StatusMap> {
        if file.is_folder {
            return Err(Error::InvalidInput(format!(
                "'{}' is a folder, use rmdir",
                file
            )));
        }
        let (file, repo) = self.repositories.bind(file);
        let metadata = repo.store().get_metadata(&file).await?;

        let statuses = match metadata.id.first() {
            Some(id) if metadata.is_manifest && !repo.is_secret() => {
                self.engine.delete_manifest(*id).await
            }
            _ => self.engine.delete(repo.usage(), &metadata.id).await,
        };

        if !statuses.all_ok() {
            warn!(
                file = %file,
                failed = statuses.failures().count(),
                "Particles not deleted; metadata kept"
            );
            return Err(Error::PartialFailure(statuses));
        }

        repo.store().del_metadata(&file).await?;
        info!(file = %file, particles = statuses.len(), "Deleted");
        Ok(statuses)
    }

    /// Move an object.
    ///
    /// - Remote to remote in one repository: a metadata store move
    /// - Remote to remote across repositories: metadata copy, then source
    ///   metadata delete
    /// - Remote to local: download, then delete
    /// - Local to remote: upload; the local file is kept
    pub async fn move_object(
        &self,
        source: &ObjectDescriptor,
        target: &ObjectDescriptor,
        options: &PutOptions,
    ) -> Result<()> {
        match (source.is_remote, target.is_remote) {
            (true, true) => {
                let (source, source_repo, target, target_repo) = self.bind_pair(source, target)?;
                if source_repo.name() == target_repo.name() {
                    source_repo.store().move_object(&source, &target).await?;
                } else {
                    let metadata = source_repo.store().get_metadata(&source).await?;
                    if target_repo.store().exists(&target).await? {
                        return Err(Error::AlreadyExists(format!("Target {} exists", target)));
                    }
                    target_repo.store().put_metadata(&metadata, &target).await?;
                    source_repo.store().del_metadata(&source).await?;
                }
                info!(source = %source, object = %target, "Moved");
                Ok(())
            }
            (true, false) => {
                self.get(source, target, options.key.as_ref()).await?;
                self.delete(source).await?;
                Ok(())
            }
            (false, true) => {
                self.put(source, target, options).await?;
                warn!(source = %source, "Local file is not being removed");
                Ok(())
            }
            (false, false) => Err(Error::Unsupported(
                "use OS tools when working with the local filesystem".to_string(),
            )),
        }
    }

    /// Copy an object.
    ///
    /// Remote to remote copies only the metadata, so the copy shares the
    /// source's particles. That is refused within one repository.
    pub async fn copy(
        &self,
        source: &ObjectDescriptor,
        target: &ObjectDescriptor,
        options: &PutOptions,
    ) -> Result<()> {
        match (source.is_remote, target.is_remote) {
            (false, true) => self.put(source, target, options).await.map(|_| ()),
            (true, false) => self
                .get(source, target, options.key.as_ref())
                .await
                .map(|_| ()),
            (true, true) => {
                let (source, source_repo, target, target_repo) = self.bind_pair(source, target)?;
                if source_repo.name() == target_repo.name() {
                    return Err(Error::Unsupported(
                        "copying data within one repository is not supported".to_string(),
                    ));
                }
                let metadata = source_repo.store().get_metadata(&source).await?;
                if target_repo.store().exists(&target).await? {
                    return Err(Error::AlreadyExists(format!("Target {} exists", target)));
                }
                target_repo.store().put_metadata(&metadata, &target).await?;
                info!(source = %source, object = %target, "Copied metadata");
                Ok(())
            }
            (false, false) => Err(Error::Unsupported(
                "use OS tools when working with the local filesystem".to_string(),
            )),
        }
    }

    /// Bind a remote file and a remote target for move or copy.
    ///
    /// A folder target takes the source's name. Both repositories must route
    /// particles through the same usage surface.
    fn bind_pair(
        &self,
        source: &ObjectDescriptor,
        target: &ObjectDescriptor,
    ) -> Result<(ObjectDescriptor, &Repository, ObjectDescriptor, &Repository)> {
        if source.is_folder {
            return Err(Error::Unsupported("only files can be moved or copied".to_string()));
        }
        let target = if target.is_folder {
            target.child_file(source.name.clone())
        } else {
            target.clone()
        };
        let (source, source_repo) = self.repositories.bind(source);
        let (target, target_repo) = self.repositories.bind(&target);
        if source_repo.usage() != target_repo.usage() {
            return Err(Error::Unsupported(format!(
                "repositories '{}' ({}) and '{}' ({}) use different particle surfaces",
                source_repo.name(),
                source_repo.usage(),
                target_repo.name(),
                target_repo.usage()
            )));
        }
        Ok((source, source_repo, target, target_repo))
    }

    /// Find files whose tags match.
    ///
    /// # Errors
    /// - `Unsupported` if the repository's backend has no tag search
    pub async fn search(
        &self,
        folder: &ObjectDescriptor,
        tag: Option<&str>,
        value: Option<&str>,
        recursive: bool,
    ) -> Result<Vec<SearchResult>> {
        let (folder, repo) = self.repositories.bind(folder);
        if !repo.store().supports_search() {
            return Err(Error::Unsupported(format!(
                "repository '{}' does not support search",
                repo.name()
            )));
        }
        let mut results = repo.store().search(&folder, tag, value, recursive).await?;
        for result in &mut results {
            Self::tag(&mut result.descriptor, repo);
        }
        results.sort_by(|a, b| a.descriptor.cmp(&b.descriptor).then_with(|| a.tag.cmp(&b.tag)));
        Ok(results)
    }

    /// Metadata record of a file.
    pub async fn metadata(&self, file: &ObjectDescriptor) -> Result<ObjectMetadata> {
        if file.is_folder {
            return Err(Error::InvalidInput(
                "metadata does not exist for folders".to_string(),
            ));
        }
        let (file, repo) = self.repositories.bind(file);
        repo.store().get_metadata(&file).await
    }

    /// Import a metadata record from a local JSON file.
    ///
    /// A folder target receives the record under the name it carries.
    pub async fn add_metadata(
        &self,
        source: &Path,
        target: &ObjectDescriptor,
    ) -> Result<ObjectMetadata> {
        let text = fs::read_to_string(source).await?;
        let metadata = ObjectMetadata::from_json(&text)?;
        let target = if target.is_folder {
            target.child_file(metadata.name.clone())
        } else {
            target.clone()
        };
        let (target, repo) = self.repositories.bind(&target);
        repo.store().put_metadata(&metadata, &target).await?;
        info!(object = %target, "Metadata added");
        Ok(metadata)
    }

    /// Drop a file's metadata record, leaving its particles in place.
    pub async fn remove_metadata(&self, file: &ObjectDescriptor) -> Result<()> {
        if file.is_folder {
            return Err(Error::InvalidInput(
                "metadata does not exist for folders".to_string(),
            ));
        }
        let (file, repo) = self.repositories.bind(file);
        repo.store().del_metadata(&file).await?;
        info!(file = %file, "Metadata removed");
        Ok(())
    }

    fn named_repository(&self, repository: &str) -> Result<&Repository> {
        self.repositories
            .get(repository)
            .ok_or_else(|| Error::NotFound(format!("repository '{}' is not configured", repository)))
    }

    /// Delete one particle by identifier, on the surface `repository` uses.
    pub async fn remove_by_id(&self, repository: &str, id: Uuid) -> Result<()> {
        let repo = self.named_repository(repository)?;
        let status = self
            .engine
            .store()
            .delete(repo.usage(), id, DELETE_TIMEOUT)
            .await?;
        if status != STATUS_OK {
            return Err(Error::Backend(format!(
                "particle {} could not be removed: status {}",
                id, status
            )));
        }
        info!(id = %id, repository = %repo.name(), "Particle removed");
        Ok(())
    }

    /// Fetch one particle into `<dir>/<id>`.
    ///
    /// The file is written only when the fetch succeeded; the status map is
    /// returned either way.
    pub async fn get_chunk(&self, repository: &str, id: Uuid, dir: &Path) -> Result<StatusMap> {
        let repo = self.named_repository(repository)?;
        let download = self.engine.download(repo.usage(), &[id]).await;
        if let Some(data) = &download.data {
            fs::write(dir.join(id.to_string()), data).await?;
        }
        Ok(download.statuses)
    }

    /// Classification policies known to the particle store.
    pub async fn classifications(&self) -> Result<BTreeMap<i32, String>> {
        self.engine.store().classifications().await
    }

    fn tag(descriptor: &mut ObjectDescriptor, repo: &Repository) {
        descriptor.repository = Some(repo.name().to_string());
        descriptor.is_secret = repo.is_secret();
        descriptor.is_remote = true;
    }
}
