use super::{require_text, Catalog, CatalogError, Result};
use crate::auth::AuthContext;
use crate::storage::models::{Author, AuthorRow};

/// Author columns as supplied by a caller, with the password in plaintext.
#[derive(Debug, Clone)]
pub struct AuthorFields {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
}

impl AuthorFields {
    fn validate(&self) -> Result<()> {
        require_text("name", &self.name)?;
        require_text("surname", &self.surname)?;
        require_text("email", &self.email)?;
        require_text("password", &self.password)?;
        if !self.email.contains('@') {
            return Err(CatalogError::InvalidInput(format!(
                "'{}' is not an email address",
                self.email
            )));
        }
        Ok(())
    }
}

impl Catalog {
    // ========================================================================
    // Identity
    // ========================================================================

    /// Check a login handle and password.
    ///
    /// An unknown handle yields `false` after the same hashing work as a real
    /// check, so callers cannot tell missing accounts from wrong passwords.
    pub async fn verify_login(&self, email: &str, password: &str) -> Result<bool> {
        Ok(self.authenticate(email, password).await?.is_some())
    }

    /// Verify credentials and produce the context required by mutating calls.
    /// Hashing runs on the blocking pool.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<AuthContext>> {
        let author = self.db.find_author_by_email(email)?;
        let stored = author.as_ref().map(|a| a.password_hash.clone());

        if !self.hasher.verify_off_thread(password, stored).await? {
            return Ok(None);
        }
        Ok(author.map(|a| AuthContext::new(a.id, a.email)))
    }

    pub async fn create_author(&self, ctx: &AuthContext, fields: AuthorFields) -> Result<Author> {
        let author = self.insert_author(fields).await?;
        tracing::debug!(author_id = author.id, actor = ctx.author_id(), "Created author");
        Ok(author)
    }

    /// Overwrite an author's profile and password.
    ///
    /// The current password is not asked for again: any authenticated caller
    /// can reset any author's credentials.
    pub async fn update_author(
        &self,
        ctx: &AuthContext,
        id: u64,
        fields: AuthorFields,
    ) -> Result<Author> {
        fields.validate()?;
        let row = AuthorRow {
            password_hash: self.hasher.hash_off_thread(&fields.password).await?,
            name: fields.name,
            surname: fields.surname,
            email: fields.email,
        };

        let author = self
            .db
            .update_author(id, &row)?
            .ok_or_else(|| CatalogError::not_found("author", id))?;

        tracing::warn!(
            author_id = id,
            actor = ctx.author_id(),
            "Author credentials replaced without confirming the previous password"
        );
        Ok(author)
    }

    /// Seed the first author when the catalog has none. Returns the new author,
    /// or `None` if authors already exist.
    pub async fn ensure_bootstrap_author(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Author>> {
        if self.db.count_authors()? > 0 {
            return Ok(None);
        }

        let author = self.insert_author(AuthorFields {
            name: "Catalog".to_string(),
            surname: "Administrator".to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })
        .await?;
        tracing::info!(author_id = author.id, email = %author.email, "Seeded bootstrap author");
        Ok(Some(author))
    }

    pub fn get_author(&self, id: u64) -> Result<Author> {
        self.db
            .get_author(id)?
            .ok_or_else(|| CatalogError::not_found("author", id))
    }

    pub fn list_authors(&self) -> Result<Vec<Author>> {
        Ok(self.db.list_authors()?)
    }

    async fn insert_author(&self, fields: AuthorFields) -> Result<Author> {
        fields.validate()?;
        let row = AuthorRow {
            password_hash: self.hasher.hash_off_thread(&fields.password).await?,
            name: fields.name,
            surname: fields.surname,
            email: fields.email,
        };
        Ok(self.db.insert_author(&row)?)
    }
}
