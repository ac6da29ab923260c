use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::{prelude::*, safe_tickets};

const PENDING: &str = "Pending";

/// Read access to tickets mirrored from SAFE.
pub struct TicketRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> TicketRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn pending(&self) -> Result<Vec<safe_tickets::Model>, DbErr> {
        SafeTickets::find()
            .filter(safe_tickets::Column::Status.eq(PENDING))
            .order_by_asc(safe_tickets::Column::Id)
            .all(self.conn)
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<safe_tickets::Model>, DbErr> {
        SafeTickets::find_by_id(id).one(self.conn).await
    }
}
