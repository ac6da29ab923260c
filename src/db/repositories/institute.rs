use sea_orm::{ConnectionTrait, DbErr, EntityTrait, QueryOrder, Set};

use crate::entities::{institutes, prelude::*};

pub struct InstituteRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> InstituteRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn add(&self, inst_id: &str, name: &str) -> Result<(), DbErr> {
        let active_model = institutes::ActiveModel {
            inst_id: Set(inst_id.to_string()),
            name: Set(name.to_string()),
            creation_date: Set(crate::db::now()),
        };

        Institutes::insert(active_model)
            .exec_without_returning(self.conn)
            .await?;
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<institutes::Model>, DbErr> {
        Institutes::find()
            .order_by_asc(institutes::Column::InstId)
            .all(self.conn)
            .await
    }
}
