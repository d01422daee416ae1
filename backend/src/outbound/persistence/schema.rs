//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. The
//! `diesel print-schema` command regenerates them from a live database.

diesel::table! {
    /// Bookable resources.
    resources (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Human-readable name.
        name -> Text,
        /// Minimum minutes between booking time and reservation start.
        min_lead_minutes -> Int4,
        /// Price per hour in minor currency units.
        hourly_rate_cents -> Int8,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Discount coupons. Exactly one of the two discount columns is set.
    coupons (id) {
        id -> Uuid,
        /// Redemption code, unique case-insensitively.
        code -> Text,
        amount_off_cents -> Nullable<Int8>,
        percent_off -> Nullable<Int4>,
        valid_from -> Timestamptz,
        valid_until -> Timestamptz,
    }
}

diesel::table! {
    /// Reservations over half-open `[start_at, end_at)` slots.
    reservations (id) {
        id -> Uuid,
        resource_id -> Uuid,
        user_id -> Uuid,
        /// One of `pending`, `confirmed`, `cancelled`.
        status -> Text,
        start_at -> Timestamptz,
        end_at -> Timestamptz,
        note -> Nullable<Text>,
        coupon_id -> Nullable<Uuid>,
        total_price_cents -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Idempotency ledger keyed by (key, user_id).
    idempotency_records (key, user_id) {
        /// Client-supplied idempotency key.
        key -> Text,
        user_id -> Uuid,
        /// Protected command, e.g. `reservations.create`.
        endpoint -> Text,
        /// One of `processing`, `completed`.
        status -> Text,
        /// SHA-256 of the normalized request (32 bytes).
        request_hash -> Bytea,
        /// SHA-256 of the result payload, set on completion.
        result_hash -> Nullable<Bytea>,
        result_reservation_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        expires_at -> Timestamptz,
    }
}

diesel::table! {
    /// Outbound notification jobs polled by an external worker.
    notification_jobs (id) {
        id -> Uuid,
        kind -> Text,
        topic -> Text,
        payload -> Bytea,
        run_at -> Timestamptz,
        /// Delivery state; rows are written as `queued`.
        status -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(reservations -> resources (resource_id));
diesel::joinable!(reservations -> coupons (coupon_id));

diesel::allow_tables_to_appear_in_same_query!(
    coupons,
    idempotency_records,
    notification_jobs,
    reservations,
    resources,
);
