// Diesel table definitions for the SQLite schema in migrations/.

diesel::table! {
    clients (id) {
        id -> Integer,
        client_id -> Text,
        business_name -> Text,
        contact_email -> Text,
        website_url -> Text,
        access_token -> Text,
        subscription_status -> Text,
        account_type -> Text,
        plan_type -> Text,
        billing_cycle -> Text,
        max_users -> Integer,
        owner_user_id -> Nullable<Text>,
        trial_start_time -> Nullable<Timestamp>,
        trial_end_time -> Nullable<Timestamp>,
        trial_duration_hours -> Nullable<Integer>,
        trial_extended_count -> Integer,
        auto_restricted_at -> Nullable<Timestamp>,
        conversion_date -> Nullable<Timestamp>,
        created_at -> Timestamp,
        last_access -> Nullable<Timestamp>,
    }
}

diesel::table! {
    client_users (id) {
        id -> Integer,
        user_id -> Text,
        client_id -> Text,
        name -> Text,
        email -> Text,
        role -> Text,
        access_token -> Text,
        status -> Text,
        created_by -> Nullable<Text>,
        access_expires_at -> Nullable<Timestamp>,
        trial_restricted -> Bool,
        allowed_ips -> Nullable<Text>,
        country_restrictions -> Nullable<Text>,
        block_vpn -> Bool,
        permissions -> Nullable<Text>,
        session_limit -> Integer,
        notes -> Nullable<Text>,
        created_at -> Timestamp,
        last_access -> Nullable<Timestamp>,
    }
}

diesel::table! {
    user_sessions (id) {
        id -> Integer,
        session_id -> Text,
        user_id -> Text,
        client_id -> Text,
        ip_address -> Nullable<Text>,
        country_code -> Nullable<Text>,
        is_vpn -> Bool,
        user_agent -> Nullable<Text>,
        expires_at -> Timestamp,
        is_active -> Bool,
        created_at -> Timestamp,
        last_activity -> Timestamp,
    }
}

diesel::table! {
    access_logs (id) {
        id -> Integer,
        user_id -> Nullable<Text>,
        client_id -> Nullable<Text>,
        action -> Text,
        resource -> Nullable<Text>,
        ip_address -> Nullable<Text>,
        country_code -> Nullable<Text>,
        is_vpn -> Bool,
        user_agent -> Nullable<Text>,
        success -> Bool,
        details -> Nullable<Text>,
        timestamp -> Timestamp,
    }
}

diesel::table! {
    visitor_investigations (id) {
        id -> Integer,
        visitor_id -> Text,
        client_id -> Text,
        name -> Nullable<Text>,
        email -> Nullable<Text>,
        phone -> Nullable<Text>,
        company -> Nullable<Text>,
        job_title -> Nullable<Text>,
        location -> Nullable<Text>,
        ip_address -> Nullable<Text>,
        user_agent -> Nullable<Text>,
        current_page -> Nullable<Text>,
        pages_visited -> Nullable<Text>,
        time_on_site_seconds -> Integer,
        interest_level -> Text,
        traffic_source -> Nullable<Text>,
        device_type -> Nullable<Text>,
        browser -> Nullable<Text>,
        operating_system -> Nullable<Text>,
        session_count -> Integer,
        total_page_views -> Integer,
        is_active -> Bool,
        first_visit -> Timestamp,
        last_activity -> Timestamp,
    }
}

diesel::table! {
    trials (id) {
        id -> Integer,
        trial_id -> Text,
        client_id -> Text,
        granted_by -> Nullable<Text>,
        trial_type -> Text,
        duration_hours -> Integer,
        start_time -> Timestamp,
        end_time -> Timestamp,
        status -> Text,
        reminder_sent -> Bool,
        expiration_warning_sent -> Bool,
        auto_restricted_at -> Nullable<Timestamp>,
        extension_count -> Integer,
        conversion_attempted -> Bool,
        notes -> Nullable<Text>,
    }
}

diesel::table! {
    trial_notifications (id) {
        id -> Integer,
        notification_id -> Text,
        client_id -> Text,
        notification_type -> Text,
        scheduled_time -> Timestamp,
        sent_time -> Nullable<Timestamp>,
        status -> Text,
        retry_count -> Integer,
    }
}

diesel::table! {
    automated_tasks (id) {
        id -> Integer,
        task_id -> Text,
        task_type -> Text,
        client_id -> Nullable<Text>,
        trial_id -> Nullable<Text>,
        status -> Text,
        scheduled_at -> Timestamp,
        executed_at -> Nullable<Timestamp>,
        result -> Nullable<Text>,
        error_message -> Nullable<Text>,
        retry_count -> Integer,
        max_retries -> Integer,
        task_data -> Nullable<Text>,
    }
}

diesel::table! {
    payment_plans (id) {
        id -> Integer,
        plan_id -> Text,
        name -> Text,
        description -> Nullable<Text>,
        price_monthly -> Double,
        price_yearly -> Double,
        max_users -> Integer,
        max_websites -> Integer,
        features -> Text,
        is_active -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    subscriptions (id) {
        id -> Integer,
        subscription_id -> Text,
        client_id -> Text,
        plan_id -> Text,
        payment_provider -> Text,
        provider_subscription_id -> Nullable<Text>,
        status -> Text,
        billing_cycle -> Text,
        amount -> Double,
        currency -> Text,
        current_period_start -> Nullable<Timestamp>,
        current_period_end -> Nullable<Timestamp>,
        cancel_at_period_end -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    payment_transactions (id) {
        id -> Integer,
        transaction_id -> Text,
        client_id -> Text,
        subscription_id -> Nullable<Text>,
        payment_provider -> Text,
        provider_transaction_id -> Nullable<Text>,
        amount -> Double,
        currency -> Text,
        status -> Text,
        description -> Nullable<Text>,
        created_at -> Timestamp,
        processed_at -> Nullable<Timestamp>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    clients,
    client_users,
    user_sessions,
    access_logs,
    visitor_investigations,
    trials,
    trial_notifications,
    automated_tasks,
    payment_plans,
    subscriptions,
    payment_transactions,
);
