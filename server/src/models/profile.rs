use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{optional_text, required_text, ModelError};
use crate::utils::validate::require_v4;

pub const MAX_BIO_LEN: usize = 255;
pub const MAX_EMAIL_LEN: usize = 128;
pub const MAX_PERSON_NAME_LEN: usize = 32;
pub const MAX_IMAGE_LEN: usize = 255;
pub const MAX_USERNAME_LEN: usize = 32;
pub const ACTIVATION_TOKEN_LEN: usize = 32;
pub const HASH_LEN: usize = 128;
pub const SALT_LEN: usize = 64;

const COLUMNS: &str =
    "id, activation_token, bio, email, first_name, hash, image, last_name, salt, username";

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ProfileFields {
    pub id: Uuid,
    pub activation_token: Option<String>,
    pub bio: Option<String>,
    pub email: String,
    pub first_name: String,
    pub hash: String,
    pub image: Option<String>,
    pub last_name: String,
    pub salt: String,
    pub username: String,
}

/// A CrowdVibe user. Credentials are stored but never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    #[serde(rename = "profileId")]
    id: Uuid,
    #[serde(skip)]
    activation_token: Option<String>,
    #[serde(rename = "profileBio")]
    bio: Option<String>,
    #[serde(rename = "profileEmail")]
    email: String,
    #[serde(rename = "profileFirstName")]
    first_name: String,
    #[serde(skip)]
    hash: String,
    #[serde(rename = "profileImage")]
    image: Option<String>,
    #[serde(rename = "profileLastName")]
    last_name: String,
    #[serde(skip)]
    salt: String,
    #[serde(rename = "profileUsername")]
    username: String,
}

impl Profile {
    pub fn new(fields: ProfileFields) -> Result<Self, ModelError> {
        Ok(Self {
            id: require_v4(fields.id)?,
            activation_token: validate_activation_token(fields.activation_token.as_deref())?,
            bio: validate_bio(fields.bio.as_deref())?,
            email: validate_email(&fields.email)?,
            first_name: required_text(&fields.first_name, "first name", MAX_PERSON_NAME_LEN)?,
            hash: validate_hex(&fields.hash, "profile hash", HASH_LEN)?,
            image: validate_image(fields.image.as_deref())?,
            last_name: required_text(&fields.last_name, "last name", MAX_PERSON_NAME_LEN)?,
            salt: validate_hex(&fields.salt, "profile salt", SALT_LEN)?,
            username: required_text(&fields.username, "username", MAX_USERNAME_LEN)?,
        })
    }

    fn from_row(fields: ProfileFields) -> Result<Self, ModelError> {
        Self::new(fields).map_err(ModelError::into_row_error)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn activation_token(&self) -> Option<&str> {
        self.activation_token.as_deref()
    }

    pub fn bio(&self) -> Option<&str> {
        self.bio.as_deref()
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn set_bio(&mut self, bio: Option<&str>) -> Result<(), ModelError> {
        self.bio = validate_bio(bio)?;
        Ok(())
    }

    pub fn set_email(&mut self, email: &str) -> Result<(), ModelError> {
        self.email = validate_email(email)?;
        Ok(())
    }

    pub fn set_first_name(&mut self, first_name: &str) -> Result<(), ModelError> {
        self.first_name = required_text(first_name, "first name", MAX_PERSON_NAME_LEN)?;
        Ok(())
    }

    pub fn set_last_name(&mut self, last_name: &str) -> Result<(), ModelError> {
        self.last_name = required_text(last_name, "last name", MAX_PERSON_NAME_LEN)?;
        Ok(())
    }

    pub fn set_image(&mut self, image: Option<&str>) -> Result<(), ModelError> {
        self.image = validate_image(image)?;
        Ok(())
    }

    pub fn set_username(&mut self, username: &str) -> Result<(), ModelError> {
        self.username = required_text(username, "username", MAX_USERNAME_LEN)?;
        Ok(())
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<(), ModelError> {
        sqlx::query(&format!(
            "INSERT INTO profile ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            COLUMNS
        ))
        .bind(self.id)
        .bind(&self.activation_token)
        .bind(&self.bio)
        .bind(&self.email)
        .bind(&self.first_name)
        .bind(&self.hash)
        .bind(&self.image)
        .bind(&self.last_name)
        .bind(&self.salt)
        .bind(&self.username)
        .execute(pool)
        .await?;

        tracing::debug!(profile_id = %self.id, "Inserted profile");
        Ok(())
    }

    pub async fn update(&self, pool: &PgPool) -> Result<(), ModelError> {
        sqlx::query(
            "UPDATE profile SET activation_token = $2, bio = $3, email = $4, first_name = $5, \
             hash = $6, image = $7, last_name = $8, salt = $9, username = $10 WHERE id = $1",
        )
        .bind(self.id)
        .bind(&self.activation_token)
        .bind(&self.bio)
        .bind(&self.email)
        .bind(&self.first_name)
        .bind(&self.hash)
        .bind(&self.image)
        .bind(&self.last_name)
        .bind(&self.salt)
        .bind(&self.username)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, pool: &PgPool) -> Result<(), ModelError> {
        sqlx::query("DELETE FROM profile WHERE id = $1")
            .bind(self.id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, ModelError> {
        let row: Option<ProfileFields> =
            sqlx::query_as(&format!("SELECT {} FROM profile WHERE id = $1", COLUMNS))
                .bind(id)
                .fetch_optional(pool)
                .await?;
        row.map(Self::from_row).transpose()
    }

    pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, ModelError> {
        let email = validate_email(email)?;
        let row: Option<ProfileFields> =
            sqlx::query_as(&format!("SELECT {} FROM profile WHERE email = $1", COLUMNS))
                .bind(email)
                .fetch_optional(pool)
                .await?;
        row.map(Self::from_row).transpose()
    }

    pub async fn get_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, ModelError> {
        let username = required_text(username, "username", MAX_USERNAME_LEN)?;
        let row: Option<ProfileFields> = sqlx::query_as(&format!(
            "SELECT {} FROM profile WHERE username = $1",
            COLUMNS
        ))
        .bind(username)
        .fetch_optional(pool)
        .await?;
        row.map(Self::from_row).transpose()
    }
}

fn validate_bio(bio: Option<&str>) -> Result<Option<String>, ModelError> {
    optional_text(bio, "profile bio", MAX_BIO_LEN)
}

fn validate_image(image: Option<&str>) -> Result<Option<String>, ModelError> {
    optional_text(image, "profile image", MAX_IMAGE_LEN)
}

fn validate_email(email: &str) -> Result<String, ModelError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ModelError::InvalidArgument(
            "profile email is empty".to_string(),
        ));
    }
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.chars().any(|ch| ch.is_whitespace() || ch.is_control())
        }
        None => false,
    };
    if !well_formed {
        return Err(ModelError::InvalidArgument(
            "profile email is not a valid email".to_string(),
        ));
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(ModelError::OutOfRange(
            "profile email is too long".to_string(),
        ));
    }
    Ok(email.to_string())
}

fn validate_activation_token(token: Option<&str>) -> Result<Option<String>, ModelError> {
    match token.map(str::trim) {
        None | Some("") => Ok(None),
        Some(token) => validate_hex(token, "activation token", ACTIVATION_TOKEN_LEN).map(Some),
    }
}

fn validate_hex(input: &str, what: &str, len: usize) -> Result<String, ModelError> {
    let value = input.trim().to_ascii_lowercase();
    if value.is_empty() || !value.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(ModelError::InvalidArgument(format!(
            "{} is empty or not hexadecimal",
            what
        )));
    }
    if value.len() != len {
        return Err(ModelError::OutOfRange(format!(
            "{} must be {} characters",
            what, len
        )));
    }
    Ok(value)
}
