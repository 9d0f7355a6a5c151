//! Order repository.
//!
//! Placement and status changes run inside a caller-owned transaction, so
//! those helpers take a `&mut PgConnection` instead of the pool.

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use lasu_mart_core::{CartLineId, DeliveryStatus, OrderId, PaymentMethod, UserId};

use super::RepositoryError;
use crate::models::{
    CartLineSnapshot, Order, OrderDetail, OrderDraft, OrderSort, OrderView, Page, Paginated,
    SortDirection,
};

const ORDER_COLUMNS: &str = r"
    o.order_id, o.product_id, o.product_name, o.unit_price, o.variant, o.vendor_id,
    o.quantity_ordered, o.user_id, o.address, o.payment_method, o.delivery_status,
    o.created_at, o.updated_at
";

const THUMBNAIL_COLUMN: &str = r"(SELECT i.image_url FROM product_images i
    WHERE i.product_id = o.product_id ORDER BY i.created_at LIMIT 1) AS image_url";

/// Which side of an order a listing is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Party {
    Buyer,
    Vendor,
}

impl Party {
    const fn column(self) -> &'static str {
        match self {
            Self::Buyer => "o.user_id",
            Self::Vendor => "o.vendor_id",
        }
    }
}

fn push_listing_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    party: Party,
    uid: &UserId,
    statuses: &[DeliveryStatus],
) {
    qb.push(" WHERE ")
        .push(party.column())
        .push(" = ")
        .push_bind(uid.clone());

    if !statuses.is_empty() {
        qb.push(" AND o.delivery_status IN (");
        let mut separated = qb.separated(", ");
        for status in statuses {
            separated.push_bind(*status);
        }
        separated.push_unseparated(")");
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// A buyer's order history.
    ///
    /// An empty `statuses` slice matches every status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_buyer(
        &self,
        user_id: &UserId,
        statuses: &[DeliveryStatus],
        sort: OrderSort,
        direction: SortDirection,
        page: Page,
    ) -> Result<Paginated<OrderView>, RepositoryError> {
        self.list(Party::Buyer, user_id, statuses, sort, direction, page)
            .await
    }

    /// Orders placed against a vendor's products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_vendor(
        &self,
        vendor_id: &UserId,
        statuses: &[DeliveryStatus],
        sort: OrderSort,
        direction: SortDirection,
        page: Page,
    ) -> Result<Paginated<OrderView>, RepositoryError> {
        self.list(Party::Vendor, vendor_id, statuses, sort, direction, page)
            .await
    }

    async fn list(
        &self,
        party: Party,
        uid: &UserId,
        statuses: &[DeliveryStatus],
        sort: OrderSort,
        direction: SortDirection,
        page: Page,
    ) -> Result<Paginated<OrderView>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders o");
        push_listing_filters(&mut count, party, uid, statuses);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        if total == 0 {
            return Ok(Paginated::empty());
        }

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_COLUMNS}, {THUMBNAIL_COLUMN} FROM orders o"
        ));
        push_listing_filters(&mut qb, party, uid, statuses);
        qb.push(" ORDER BY ")
            .push(sort.as_sql())
            .push(" ")
            .push(direction.as_sql())
            .push(", o.order_id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let data = qb.build_query_as::<OrderView>().fetch_all(self.pool).await?;

        Ok(Paginated {
            data,
            total_pages: page.total_pages(total),
        })
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.order_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Get an order with the buyer's contact details and a thumbnail.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let detail = sqlx::query_as::<_, OrderDetail>(&format!(
            r"
            SELECT {ORDER_COLUMNS}, {THUMBNAIL_COLUMN},
                   u.display_name AS buyer_name, u.email AS buyer_email,
                   u.phone_number AS buyer_phone
            FROM orders o
            JOIN users u ON u.user_id = o.user_id
            WHERE o.order_id = $1
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(detail)
    }

    // =========================================================================
    // Transaction helpers
    // =========================================================================

    /// Read and lock a user's cart lines, joined to whatever remains of
    /// each product. Product columns are only `NULL` for a product deleted
    /// concurrently; completed deletes cascade to the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_cart(
        conn: &mut PgConnection,
        user_id: &UserId,
    ) -> Result<Vec<CartLineSnapshot>, RepositoryError> {
        let lines = sqlx::query_as::<_, CartLineSnapshot>(
            r"
            SELECT c.cart_line_id, c.product_id, c.variant, c.quantity,
                   p.product_name, p.price AS unit_price, p.vendor_id
            FROM cart_lines c
            LEFT JOIN products p ON p.product_id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.created_at
            FOR UPDATE OF c
            ",
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(lines)
    }

    /// Insert one order per draft.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_drafts(
        conn: &mut PgConnection,
        user_id: &UserId,
        address: &str,
        payment_method: PaymentMethod,
        drafts: &[OrderDraft],
    ) -> Result<Vec<Order>, RepositoryError> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            r"INSERT INTO orders (product_id, product_name, unit_price, variant, vendor_id,
                                  quantity_ordered, user_id, address, payment_method) ",
        );
        qb.push_values(drafts, |mut row, draft| {
            row.push_bind(draft.product_id)
                .push_bind(draft.product_name.clone())
                .push_bind(draft.unit_price)
                .push_bind(draft.variant.clone())
                .push_bind(draft.vendor_id.clone())
                .push_bind(draft.quantity)
                .push_bind(user_id.clone())
                .push_bind(address.to_owned())
                .push_bind(payment_method);
        });
        qb.push(
            r" RETURNING order_id, product_id, product_name, unit_price, variant, vendor_id,
                         quantity_ordered, user_id, address, payment_method, delivery_status,
                         created_at, updated_at",
        );

        let orders = qb.build_query_as::<Order>().fetch_all(conn).await?;
        Ok(orders)
    }

    /// Delete the consumed cart lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_cart_lines(
        conn: &mut PgConnection,
        ids: &[CartLineId],
    ) -> Result<u64, RepositoryError> {
        let ids: Vec<uuid::Uuid> = ids.iter().map(CartLineId::as_uuid).collect();
        let result = sqlx::query("DELETE FROM cart_lines WHERE cart_line_id = ANY($1)")
            .bind(ids)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Queue one notification per `(vendor, message)` pair.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn notify_vendors(
        conn: &mut PgConnection,
        notifications: &[(UserId, String)],
    ) -> Result<(), RepositoryError> {
        if notifications.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO notifications (user_id, message) ");
        qb.push_values(notifications, |mut row, (vendor_id, message)| {
            row.push_bind(vendor_id.clone()).push_bind(message.clone());
        });
        qb.build().execute(conn).await?;

        Ok(())
    }

    /// Read and lock one order for a status change.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock(
        conn: &mut PgConnection,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.order_id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(order)
    }

    /// Set an order's delivery status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn set_status(
        conn: &mut PgConnection,
        id: OrderId,
        status: DeliveryStatus,
    ) -> Result<Order, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(
            r"
            UPDATE orders
            SET delivery_status = $2, updated_at = NOW()
            WHERE order_id = $1
            RETURNING order_id, product_id, product_name, unit_price, variant, vendor_id,
                      quantity_ordered, user_id, address, payment_method, delivery_status,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(order)
    }
}
