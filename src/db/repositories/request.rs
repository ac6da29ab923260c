use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select,
    Set,
};

use crate::domain::RequestId;
use crate::entities::{prelude::*, requests, users};

/// A request joined with the requesting user's names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRow {
    pub id: RequestId,
    pub username: String,
    pub givenname: String,
    pub surname: Option<String>,
    pub email: String,
    pub poc_cc_email: Option<String>,
    pub isdone: bool,
    pub approver: Option<String>,
    pub cluster: String,
    pub creation_date: String,
    pub modification_date: Option<String>,
}

pub struct RequestInsert<'r> {
    pub username: &'r str,
    pub email: &'r str,
    pub ssh_key: &'r str,
    pub poc_cc_email: Option<&'r str>,
    pub cluster: &'r str,
}

/// Which open requests a listing should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedFilter {
    /// Real requests only.
    Exclude,
    /// Only the reserved test requests.
    Only,
}

pub struct RequestRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> RequestRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    fn map_row((request, user): (requests::Model, Option<users::Model>)) -> Option<RequestRow> {
        // inner join: requests without a user row are not listed
        let user = user?;
        Some(RequestRow {
            id: RequestId::new(request.id),
            username: request.username,
            givenname: user.givenname,
            surname: user.surname,
            email: request.email,
            poc_cc_email: request.poc_cc_email,
            isdone: request.isdone,
            approver: request.approver,
            cluster: request.cluster,
            creation_date: request.creation_date,
            modification_date: request.modification_date,
        })
    }

    async fn rows(&self, select: Select<Requests>) -> Result<Vec<RequestRow>, DbErr> {
        let rows = select
            .find_also_related(Users)
            .all(self.conn)
            .await?;

        Ok(rows.into_iter().filter_map(Self::map_row).collect())
    }

    pub async fn insert(&self, request: &RequestInsert<'_>) -> Result<RequestId, DbErr> {
        let active_model = requests::ActiveModel {
            username: Set(request.username.to_string()),
            email: Set(request.email.to_string()),
            ssh_key: Set(request.ssh_key.to_string()),
            poc_cc_email: Set(request.poc_cc_email.map(str::to_string)),
            cluster: Set(request.cluster.to_string()),
            isdone: Set(false),
            approver: Set(None),
            creation_date: Set(crate::db::now()),
            ..Default::default()
        };

        let res = Requests::insert(active_model).exec(self.conn).await?;
        Ok(RequestId::new(res.last_insert_id))
    }

    /// Full request records (including SSH keys) for the given ids, in id order.
    pub async fn get_many(&self, ids: &[RequestId]) -> Result<Vec<requests::Model>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Requests::find()
            .filter(requests::Column::Id.is_in(ids.iter().map(|id| id.value())))
            .order_by_asc(requests::Column::Id)
            .all(self.conn)
            .await
    }

    pub async fn mark_done(&self, id: RequestId, approver: &str) -> Result<u64, DbErr> {
        let result = Requests::update_many()
            .col_expr(requests::Column::Isdone, Expr::value(true))
            .col_expr(requests::Column::Approver, Expr::value(approver))
            .col_expr(requests::Column::ModificationDate, Expr::value(crate::db::now()))
            .filter(requests::Column::Id.eq(id.value()))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected)
    }

    /// Open requests for `cluster`, with or without the reserved test ids.
    pub async fn open(
        &self,
        cluster: &str,
        reserved: &[i32],
        filter: ReservedFilter,
    ) -> Result<Vec<RequestRow>, DbErr> {
        let reserved = reserved.iter().copied();
        let select = Requests::find()
            .filter(requests::Column::Isdone.eq(false))
            .filter(requests::Column::Cluster.eq(cluster));

        let select = match filter {
            ReservedFilter::Exclude => select.filter(requests::Column::Id.is_not_in(reserved)),
            ReservedFilter::Only => select.filter(requests::Column::Id.is_in(reserved)),
        };

        self.rows(select.order_by_asc(requests::Column::Id)).await
    }

    pub async fn all(&self) -> Result<Vec<RequestRow>, DbErr> {
        self.rows(Requests::find().order_by_asc(requests::Column::Id))
            .await
    }

    pub async fn recent(&self, limit: u64) -> Result<Vec<RequestRow>, DbErr> {
        self.rows(
            Requests::find()
                .order_by_desc(requests::Column::CreationDate)
                .order_by_desc(requests::Column::Id)
                .limit(limit),
        )
        .await
    }
}
