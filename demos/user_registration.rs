//! User registration - pure core, imperative shell
//!
//! The registration rules are a pipeline of pure steps. Steps that need the
//! database return commands instead of calling it, so the whole flow can be
//! inspected before anything touches storage. `main` is the shell: it hands
//! each flow to the interpreter.
//!
//! Run with `cargo run --example user_registration`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use undertow::prelude::*;

// ============================================================================
// Domain Types
// ============================================================================

#[derive(Debug, Clone)]
struct NewUser {
    email: String,
    password: String,
}

#[derive(Debug, Clone)]
struct User {
    id: u64,
    email: String,
    password_hash: String,
}

#[derive(Debug)]
enum RegistrationError {
    InvalidEmail,
    PasswordTooShort,
    AlreadyRegistered(String),
    Database(DbError),
}

#[derive(Debug)]
struct DbError(String);

impl From<DbError> for RegistrationError {
    fn from(err: DbError) -> Self {
        RegistrationError::Database(err)
    }
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RegistrationError::InvalidEmail => write!(f, "Invalid email format."),
            RegistrationError::PasswordTooShort => {
                write!(f, "Password must be at least 8 characters.")
            }
            RegistrationError::AlreadyRegistered(email) => {
                write!(f, "{} is already registered", email)
            }
            RegistrationError::Database(DbError(msg)) => write!(f, "database error: {}", msg),
        }
    }
}

// ============================================================================
// In-memory database (the collaborator that performs real side effects)
// ============================================================================

#[derive(Clone, Default)]
struct Database {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl Database {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, DbError> {
        let mut users = self.users.write().await;
        let user = User {
            id: users.len() as u64 + 1,
            email: new_user.email.clone(),
            password_hash: format!("hashed_{}", new_user.password),
        };
        users.insert(new_user.email, user.clone());
        Ok(user)
    }
}

// ============================================================================
// Pure steps (the core)
// ============================================================================

fn validate(new_user: NewUser) -> Effect<NewUser, RegistrationError> {
    if !new_user.email.contains('@') {
        Effect::failure(RegistrationError::InvalidEmail)
    } else if new_user.password.len() < 8 {
        Effect::failure(RegistrationError::PasswordTooShort)
    } else {
        Effect::success(new_user)
    }
}

fn reject_existing(
    (new_user, existing): (NewUser, Option<User>),
) -> Effect<NewUser, RegistrationError> {
    match existing {
        Some(user) => Effect::failure(RegistrationError::AlreadyRegistered(user.email)),
        None => Effect::success(new_user),
    }
}

fn registration(db: Database) -> Pipeline<NewUser, User, RegistrationError> {
    let lookup_db = db.clone();
    let find = move |new_user: NewUser| {
        let db = lookup_db.clone();
        let email = new_user.email.clone();
        Effect::command(
            "find_user_by_email",
            move || async move { db.find_by_email(&email).await },
            move |existing: Option<User>| Effect::success((new_user, existing)),
        )
        .map_err(RegistrationError::from)
    };
    let save = move |new_user: NewUser| {
        let db = db.clone();
        Effect::command(
            "save_user",
            move || async move { db.insert(new_user).await },
            Effect::success,
        )
        .map_err(RegistrationError::from)
    };

    pipeline![validate, find, reject_existing, save]
}

// ============================================================================
// The shell
// ============================================================================

#[tokio::main]
async fn main() {
    println!("=== User Registration ===\n");

    let db = Database::default();
    let register = registration(db.clone());

    let attempts = [
        ("test@test.com", "password123"),
        ("bad-email", "123"),
        ("short@test.com", "123"),
        ("test@test.com", "another-password"),
    ];

    for (email, password) in attempts {
        let new_user = NewUser {
            email: email.to_string(),
            password: password.to_string(),
        };

        // Inspect before running: a pure failure never reaches the database.
        let effect = register.run(new_user);
        match effect.label() {
            Some(label) => println!("{}: next step is `{}`", email, label),
            None => println!("{}: decided without I/O", email),
        }

        let (result, trace) = Interpreter::new().run_traced(effect).await;
        match result {
            Ok(user) => println!(
                "  registered #{} {} ({})",
                user.id, user.email, user.password_hash
            ),
            Err(err) => println!("  rejected: {}", err),
        }
        println!("  commands run: {:?}\n", trace.executed());
    }

    println!("users stored: {}", db.users.read().await.len());
}

/* Expected output:

=== User Registration ===

test@test.com: next step is `find_user_by_email`
  registered #1 test@test.com (hashed_password123)
  commands run: [Label("find_user_by_email"), Label("save_user")]

bad-email: decided without I/O
  rejected: Invalid email format.
  commands run: []

short@test.com: decided without I/O
  rejected: Password must be at least 8 characters.
  commands run: []

test@test.com: next step is `find_user_by_email`
  rejected: test@test.com is already registered
  commands run: [Label("find_user_by_email")]

users stored: 1

*/
