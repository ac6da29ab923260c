use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "pointofcontact")]
pub struct Model {
    /// Short ID in the form `NameName_instituteID`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub poc_id: String,

    pub poc_givenname: String,

    pub poc_surname: Option<String>,

    pub poc_email: Option<String>,

    pub institute: String,

    /// The contact's own cluster username, if they have one.
    pub username: Option<String>,

    pub status: String,

    pub creation_date: String,

    pub modification_date: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
