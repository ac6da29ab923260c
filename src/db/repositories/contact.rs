use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::domain::AccountStatus;
use crate::entities::{points_of_contact, prelude::*};

pub struct ContactInsert<'c> {
    pub poc_id: &'c str,
    pub given_name: &'c str,
    pub surname: Option<&'c str>,
    pub email: &'c str,
    pub institute: &'c str,
    pub username: Option<&'c str>,
}

pub struct ContactRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> ContactRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn add(&self, contact: &ContactInsert<'_>) -> Result<(), DbErr> {
        let active_model = points_of_contact::ActiveModel {
            poc_id: Set(contact.poc_id.to_string()),
            poc_givenname: Set(contact.given_name.to_string()),
            poc_surname: contact.surname.map_or(NotSet, |s| Set(Some(s.to_string()))),
            poc_email: Set(Some(contact.email.to_string())),
            institute: Set(contact.institute.to_string()),
            username: contact.username.map_or(NotSet, |u| Set(Some(u.to_string()))),
            status: Set(AccountStatus::Active.as_str().to_string()),
            creation_date: Set(crate::db::now()),
            modification_date: NotSet,
        };

        PointsOfContact::insert(active_model)
            .exec_without_returning(self.conn)
            .await?;
        Ok(())
    }

    /// `None` if there is no such contact, `Some(None)` if it has no email.
    pub async fn email_for(&self, poc_id: &str) -> Result<Option<Option<String>>, DbErr> {
        PointsOfContact::find_by_id(poc_id.to_string())
            .select_only()
            .column(points_of_contact::Column::PocEmail)
            .into_tuple()
            .one(self.conn)
            .await
    }

    /// Contact records belonging to a cluster user, e.g. the operator.
    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Vec<points_of_contact::Model>, DbErr> {
        PointsOfContact::find()
            .filter(points_of_contact::Column::Username.eq(username))
            .order_by_asc(points_of_contact::Column::PocId)
            .all(self.conn)
            .await
    }

    pub async fn list_all(&self) -> Result<Vec<points_of_contact::Model>, DbErr> {
        PointsOfContact::find()
            .order_by_asc(points_of_contact::Column::PocId)
            .all(self.conn)
            .await
    }
}
