//! Async, observable access to the local store.
//!
//! Every repository publishes the full table after each committed write
//! through a `watch` channel. Store calls run on tokio's blocking pool so
//! callers on the runtime never wait on SQLite directly.

use crate::db::{self, Database, ObserverState, ProjectScoped, RemoteMirrored, StoredEntity, PROJECT_SCOPED_TABLES};
use crate::errors::AppResult;
use crate::models::{
    DataEntry, DataProcessing, DatasetRequest, MeaningfulObjectives, ModelTraining, Profile, Project, User,
    PROFILE_ID,
};
use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

pub type ProjectRepository = Repository<Project>;
pub type DataEntryRepository = Repository<DataEntry>;
pub type DataProcessingRepository = Repository<DataProcessing>;
pub type ModelTrainingRepository = Repository<ModelTraining>;
pub type DatasetRequestRepository = Repository<DatasetRequest>;
pub type ProfileRepository = Repository<Profile>;
pub type UserRepository = Repository<User>;
pub type ObjectivesRepository = Repository<MeaningfulObjectives>;

pub struct Repository<E: StoredEntity> {
    db: Arc<Database>,
    snapshots: Arc<watch::Sender<Vec<E>>>,
}

impl<E: StoredEntity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            snapshots: self.snapshots.clone(),
        }
    }
}

impl<E: StoredEntity> Repository<E> {
    pub fn new(db: Arc<Database>) -> AppResult<Self> {
        let (sender, _) = watch::channel(Vec::new());
        let snapshots = Arc::new(sender);
        let weak = Arc::downgrade(&snapshots);
        db.on_change(
            E::TABLE,
            Arc::new(move |conn: &Connection| -> AppResult<ObserverState> {
                let Some(sender) = weak.upgrade() else {
                    return Ok(ObserverState::Dropped);
                };
                sender.send_replace(E::list(conn)?);
                Ok(ObserverState::Live)
            }),
        )?;
        Ok(Self { db, snapshots })
    }

    async fn run<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Database) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(db.as_ref())).await?
    }

    /// Upserts by primary key and returns the row's id.
    pub async fn insert(&self, entity: E) -> AppResult<i64> {
        self.run(move |db| db.insert(&entity))
            .await
            .inspect_err(|error| tracing::warn!(table = E::TABLE, error = %error, "local insert failed"))
    }

    /// Upserts a batch atomically; a single snapshot is published.
    pub async fn insert_all(&self, entities: Vec<E>) -> AppResult<usize> {
        self.run(move |db| db.insert_all(&entities))
            .await
            .inspect_err(|error| tracing::warn!(table = E::TABLE, error = %error, "local batch insert failed"))
    }

    pub async fn update(&self, entity: E) -> AppResult<()> {
        self.run(move |db| db.update(&entity))
            .await
            .inspect_err(|error| tracing::warn!(table = E::TABLE, error = %error, "local update failed"))
    }

    /// Deleting a row that is not stored, or was never assigned an id, is a no-op.
    pub async fn delete(&self, entity: &E) -> AppResult<bool> {
        match entity.key() {
            Some(id) => self.delete_by_id(id).await,
            None => Ok(false),
        }
    }

    pub async fn delete_by_id(&self, id: i64) -> AppResult<bool> {
        self.run(move |db| db.delete::<E>(id))
            .await
            .inspect_err(|error| tracing::warn!(table = E::TABLE, error = %error, "local delete failed"))
    }

    pub async fn get(&self, id: i64) -> AppResult<Option<E>> {
        self.run(move |db| db.get::<E>(id)).await
    }

    /// Subscribes to full-table snapshots. The receiver holds the latest
    /// snapshot immediately and is notified after each committed write.
    pub fn get_all(&self) -> watch::Receiver<Vec<E>> {
        self.snapshots.subscribe()
    }

    /// Same as [`Repository::get_all`] as a stream whose first item is the current snapshot.
    pub fn stream(&self) -> WatchStream<Vec<E>> {
        WatchStream::new(self.get_all())
    }

    pub fn snapshot(&self) -> Vec<E> {
        self.snapshots.borrow().clone()
    }
}

impl<E: ProjectScoped> Repository<E> {
    pub async fn latest_for_project(&self, project_name: &str) -> AppResult<Option<E>> {
        let project_name = project_name.to_string();
        self.run(move |db| db.read(|conn| E::latest_for_project(conn, &project_name)))
            .await
    }

    pub async fn list_for_project(&self, project_name: &str) -> AppResult<Vec<E>> {
        let project_name = project_name.to_string();
        self.run(move |db| db.read(|conn| E::list_for_project(conn, &project_name)))
            .await
    }
}

impl<E: RemoteMirrored> Repository<E> {
    /// Caches backend rows by their remote id; see [`Database::merge_remote`].
    pub async fn merge_remote(&self, rows: Vec<E>) -> AppResult<Vec<E>> {
        self.run(move |db| db.merge_remote(rows))
            .await
            .inspect_err(|error| tracing::warn!(table = E::TABLE, error = %error, "remote merge failed"))
    }
}

impl Repository<DataEntry> {
    pub async fn get_problem_framing_by_project_name(&self, project_name: &str) -> AppResult<Option<DataEntry>> {
        self.latest_for_project(project_name).await
    }
}

impl Repository<Project> {
    pub async fn find_by_name(&self, project_name: &str) -> AppResult<Option<Project>> {
        let project_name = project_name.to_string();
        self.run(move |db| db.read(|conn| db::find_project_by_name(conn, &project_name)))
            .await
    }

    /// Renames a project together with every record attached to it by name.
    pub async fn rename(&self, id: i64, new_name: &str) -> AppResult<Project> {
        let new_name = new_name.to_string();
        let mut tables = vec![Project::TABLE];
        tables.extend(PROJECT_SCOPED_TABLES);
        self.run(move |db| db.write(&tables, |conn| db::rename_project(conn, id, &new_name)))
            .await
    }
}

impl Repository<Profile> {
    pub async fn load(&self) -> AppResult<Option<Profile>> {
        self.get(PROFILE_ID).await
    }

    pub async fn save(&self, profile: Profile) -> AppResult<()> {
        self.insert(profile).await.map(|_| ())
    }
}

impl Repository<User> {
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.to_string();
        self.run(move |db| db.read(|conn| db::find_user_by_email(conn, &email)))
            .await
    }

    /// Hashes the password and stores a new account; a taken email is a
    /// `Constraint` failure.
    pub async fn register(&self, email: &str, username: &str, password: &str, cost: u32) -> AppResult<User> {
        let (email, username, password) = (email.to_string(), username.to_string(), password.to_string());
        self.run(move |db| {
            let user = User::with_cost(&email, &username, &password, cost)?;
            let id = db.insert(&user)?;
            Ok(User { id: Some(id), ..user })
        })
        .await
    }

    /// Returns the account when the password matches, `None` otherwise.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<Option<User>> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(None);
        };
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || {
            let ok = user.verify_password(&password)?;
            Ok::<_, crate::errors::AppError>(ok.then_some(user))
        })
        .await??;
        Ok(verified)
    }
}

impl Repository<MeaningfulObjectives> {
    pub async fn for_project(&self, project_id: i64) -> AppResult<Vec<MeaningfulObjectives>> {
        self.run(move |db| db.read(|conn| db::list_objectives_for_project(conn, project_id)))
            .await
    }
}
