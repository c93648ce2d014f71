use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "machine")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub category: String,

    pub image_url: Option<String>,
    pub video_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub technical_info: Option<String>,
    /// Flat string-to-string object.
    pub specifications: Option<Json>,

    #[sea_orm(indexed)]
    pub is_featured: bool,

    #[sea_orm(indexed)]
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
