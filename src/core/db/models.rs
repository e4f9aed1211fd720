//! Database models for the UML editor
//!
//! Entity structs map PostgreSQL rows (English column names) onto the JSON
//! wire format the editor frontend speaks (Spanish field names).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Role id granted to administrators. Admins bypass every ownership check.
pub const ADMIN_ROLE_ID: i32 = 1;

/// Raised when an enumerated wire value is outside its allow-list
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed set of upper-case wire values.
///
/// Parsing trims and upper-cases the input first, so `" actor "` is accepted
/// as `ACTOR`.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_uppercase();
                $(
                    if normalized == $wire {
                        return Ok($name::$variant);
                    }
                )+
                Err(UnknownVariant {
                    kind: stringify!($name),
                    value: s.to_string(),
                })
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

// ============================================================================
// Enumerations
// ============================================================================

wire_enum! {
    /// Lifecycle tag of a diagram. No transitions are enforced.
    DiagramStatus {
        Draft => "BORRADOR",
        Active => "ACTIVO",
        Archived => "ARCHIVADO",
    }
}

impl Default for DiagramStatus {
    fn default() -> Self {
        DiagramStatus::Active
    }
}

wire_enum! {
    /// Visual node type of an element
    ElementKind {
        Actor => "ACTOR",
        UseCase => "CASO_DE_USO",
        SystemBoundary => "LIMITE_SISTEMA",
        Package => "PAQUETE",
        Note => "NOTA",
        Text => "TEXTO",
        Image => "IMAGEN",
    }
}

wire_enum! {
    /// Edge type between two elements
    ConnectionKind {
        Association => "ASOCIACION",
        Include => "INCLUSION",
        Extend => "EXTENSION",
        Generalization => "GENERALIZACION",
        Dependency => "DEPENDENCIA",
        NoteLink => "ENLACE_NOTA",
    }
}

wire_enum! {
    /// Kind of an uploaded media file
    MediaKind {
        Audio => "AUDIO",
        Video => "VIDEO",
        Image => "IMAGEN",
    }
}

impl MediaKind {
    /// File extensions (lower-case, no dot) accepted for this media kind
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Audio => &["mp3"],
            MediaKind::Video => &["mp4"],
            MediaKind::Image => &["jpg", "jpeg"],
        }
    }

    /// Check an extension against the allow-list, ignoring case
    pub fn accepts_extension(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        self.allowed_extensions().contains(&extension.as_str())
    }
}

wire_enum! {
    /// How a media file is used by an element
    MediaUsage {
        Icon => "ICONO",
        Background => "FONDO",
        Attachment => "ADJUNTO",
    }
}

// ============================================================================
// Role Model
// ============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Role {
    #[serde(rename = "id_rol")]
    pub id: i32,
    #[serde(rename = "nombre_rol")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
}

/// Role data for creation and full replacement
#[derive(Debug, Clone)]
pub struct RoleFields {
    pub name: String,
    pub description: Option<String>,
}

// ============================================================================
// User Model
// ============================================================================

/// User as exposed over the API, joined with its role name.
/// The stored password never leaves the repository.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    #[serde(rename = "id_usuario")]
    pub id: i32,
    #[serde(rename = "nombre_usuario")]
    pub username: String,
    #[serde(rename = "correo")]
    pub email: Option<String>,
    #[serde(rename = "id_rol")]
    pub role_id: i32,
    #[serde(rename = "nombre_rol")]
    pub role_name: String,
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: DateTime<Utc>,
}

/// Stored credentials used during login
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: i32,
    pub username: String,
    pub password: String,
    pub role_id: i32,
    pub role_name: String,
}

/// User data for creation and full replacement.
/// `password` is plain text here; the repository hashes it.
#[derive(Debug, Clone)]
pub struct UserFields {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub role_id: i32,
}

// ============================================================================
// Diagram Model
// ============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Diagram {
    #[serde(rename = "id_diagrama")]
    pub id: i32,
    #[serde(rename = "id_usuario")]
    pub owner_id: i32,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "estado")]
    #[sqlx(try_from = "String")]
    pub status: DiagramStatus,
    #[serde(rename = "ancho_lienzo")]
    pub canvas_width: i32,
    #[serde(rename = "alto_lienzo")]
    pub canvas_height: i32,
    #[serde(rename = "configuracion_json")]
    pub config_json: Option<String>,
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: DateTime<Utc>,
}

/// Editable diagram columns, used for both insert and full-row update
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramFields {
    pub name: String,
    pub description: Option<String>,
    pub status: DiagramStatus,
    pub canvas_width: i32,
    pub canvas_height: i32,
    pub config_json: Option<String>,
}

// ============================================================================
// Element Model
// ============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Element {
    #[serde(rename = "id_elemento")]
    pub id: i32,
    #[serde(rename = "id_diagrama")]
    pub diagram_id: i32,
    #[serde(rename = "id_elemento_padre")]
    pub parent_id: Option<i32>,
    #[serde(rename = "tipo_elemento")]
    #[sqlx(try_from = "String")]
    pub kind: ElementKind,
    #[serde(rename = "etiqueta")]
    pub label: Option<String>,
    pub pos_x: i32,
    pub pos_y: i32,
    #[serde(rename = "ancho")]
    pub width: i32,
    #[serde(rename = "alto")]
    pub height: i32,
    #[serde(rename = "rotacion_grados", with = "rust_decimal::serde::float")]
    pub rotation_degrees: Decimal,
    #[serde(rename = "orden_z")]
    pub z_order: i32,
    #[serde(rename = "estilo_json")]
    pub style_json: Option<String>,
    #[serde(rename = "metadatos_json")]
    pub metadata_json: Option<String>,
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: DateTime<Utc>,
}

/// Editable element columns
#[derive(Debug, Clone, PartialEq)]
pub struct ElementFields {
    pub diagram_id: i32,
    pub parent_id: Option<i32>,
    pub kind: ElementKind,
    pub label: Option<String>,
    pub pos_x: i32,
    pub pos_y: i32,
    pub width: i32,
    pub height: i32,
    pub rotation_degrees: Decimal,
    pub z_order: i32,
    pub style_json: Option<String>,
    pub metadata_json: Option<String>,
}

// ============================================================================
// Connection Model
// ============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Connection {
    #[serde(rename = "id_conexion")]
    pub id: i32,
    #[serde(rename = "id_diagrama")]
    pub diagram_id: i32,
    #[serde(rename = "id_elemento_origen")]
    pub source_id: i32,
    #[serde(rename = "id_elemento_destino")]
    pub target_id: i32,
    #[serde(rename = "tipo_conexion")]
    #[sqlx(try_from = "String")]
    pub kind: ConnectionKind,
    #[serde(rename = "etiqueta")]
    pub label: Option<String>,
    #[serde(rename = "puntos_json")]
    pub points_json: Option<String>,
    #[serde(rename = "estilo_json")]
    pub style_json: Option<String>,
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: DateTime<Utc>,
}

/// Editable connection columns
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionFields {
    pub diagram_id: i32,
    pub source_id: i32,
    pub target_id: i32,
    pub kind: ConnectionKind,
    pub label: Option<String>,
    pub points_json: Option<String>,
    pub style_json: Option<String>,
}

// ============================================================================
// Media Models
// ============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MediaFile {
    #[serde(rename = "id_archivo")]
    pub id: i32,
    #[serde(rename = "id_usuario")]
    pub owner_id: i32,
    #[serde(rename = "tipo_media")]
    #[sqlx(try_from = "String")]
    pub kind: MediaKind,
    #[serde(rename = "titulo")]
    pub title: Option<String>,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "tamano_bytes")]
    pub size_bytes: i64,
    #[serde(rename = "duracion_segundos", with = "rust_decimal::serde::float_option")]
    pub duration_seconds: Option<Decimal>,
    #[serde(rename = "ancho")]
    pub width: Option<i32>,
    #[serde(rename = "alto")]
    pub height: Option<i32>,
    #[serde(rename = "ruta_archivo")]
    pub path: String,
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: DateTime<Utc>,
}

impl MediaFile {
    /// Path under which the static file service exposes this file
    pub fn public_url(&self) -> String {
        format!("/{}", self.path)
    }
}

/// Media file metadata recorded after the upload has been stored
#[derive(Debug, Clone, PartialEq)]
pub struct CreateMediaFile {
    pub owner_id: i32,
    pub kind: MediaKind,
    pub title: Option<String>,
    pub description: Option<String>,
    pub size_bytes: i64,
    pub duration_seconds: Option<Decimal>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub path: String,
}

/// A media file attached to a diagram, joined with the file's metadata
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DiagramMediaItem {
    #[serde(rename = "id_diagrama")]
    pub diagram_id: i32,
    #[serde(rename = "id_archivo")]
    pub media_id: i32,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "orden")]
    pub sort_order: i32,
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "tipo_media")]
    #[sqlx(try_from = "String")]
    pub media_kind: MediaKind,
    #[serde(rename = "titulo")]
    pub title: Option<String>,
    #[serde(rename = "ruta_archivo")]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateDiagramMedia {
    pub diagram_id: i32,
    pub media_id: i32,
    pub description: Option<String>,
    pub sort_order: i32,
}

/// A media file attached to an element, joined with the file's metadata
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ElementMediaItem {
    #[serde(rename = "id_elemento")]
    pub element_id: i32,
    #[serde(rename = "id_archivo")]
    pub media_id: i32,
    #[serde(rename = "tipo_uso")]
    #[sqlx(try_from = "String")]
    pub usage: MediaUsage,
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "tipo_media")]
    #[sqlx(try_from = "String")]
    pub media_kind: MediaKind,
    #[serde(rename = "titulo")]
    pub title: Option<String>,
    #[serde(rename = "ruta_archivo")]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateElementMedia {
    pub element_id: i32,
    pub media_id: i32,
    pub usage: MediaUsage,
}
