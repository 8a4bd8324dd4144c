//! Basic example of the Tarkib resolver.

use std::sync::Arc;

use tarkib::prelude::*;

// === Define your traits and types ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}

#[derive(Clone)]
struct Config {
    database_url: String,
}

trait UserStore: Send + Sync {
    fn find(&self, id: u64) -> String;
}

#[derive(Default, Resolvable)]
#[resolvable(upcast = "Box<dyn UserStore>")]
struct SqlUserStore {
    config: Option<Config>,
    logger: Option<Arc<dyn Logger>>,
}

impl UserStore for SqlUserStore {
    fn find(&self, id: u64) -> String {
        if let Some(logger) = &self.logger {
            logger.log(&format!("SELECT * FROM users WHERE id = {id}"));
        }
        let url = self.config.as_ref().map_or("<none>", |c| c.database_url.as_str());
        format!("user {id} from {url}")
    }
}

// Base part shared by every service.
#[derive(Default, Resolvable)]
struct ServiceBase {
    logger: Option<Arc<dyn Logger>>,
}

#[derive(Resolvable)]
struct UserService {
    #[resolvable(base)]
    base: ServiceBase,
    #[resolvable(mapped)]
    store: Box<dyn UserStore>,
    #[resolvable(skip)]
    requests: u64,
}

impl Default for UserService {
    fn default() -> Self {
        Self {
            base: ServiceBase::default(),
            store: Box::new(SqlUserStore::default()),
            requests: 0,
        }
    }
}

impl UserService {
    fn get_user(&mut self, id: u64) -> String {
        self.requests += 1;
        if let Some(logger) = &self.base.logger {
            logger.log(&format!("Getting user {id}"));
        }
        self.store.find(id)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("tarkib_container=debug")
        .init();

    let logger: Arc<dyn Logger> = Arc::new(ConsoleLogger);

    let resolver = Resolver::builder()
        .settings(ResolverSettings::default().with_max_depth(16))
        .value(Some(logger))
        .value(Some(Config {
            database_url: "postgres://localhost/myapp".to_string(),
        }))
        .map::<Box<dyn UserStore>, SqlUserStore>()
        .build()?;

    let mut service: UserService = resolver.resolve()?;
    println!("{}", service.get_user(42));
    println!("{}", service.get_user(7));
    println!("requests served: {}", service.requests);

    // A second resolution reuses the cached metadata.
    let _again: UserService = resolver.resolve()?;
    println!("{resolver:?}");

    Ok(())
}
