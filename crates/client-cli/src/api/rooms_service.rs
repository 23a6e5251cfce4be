use chrono::NaiveDate;
use shared::{
    AvailableRoomsResponse, Reservation, ReservationPayload, ReservationsByDateResponse, Room, RoomPayload,
    RoomsResponse, Timestamp,
};

use super::{ApiError, ServiceClient};

/// Rooms and reservations.
pub struct RoomsApi {
    client: ServiceClient,
}

impl RoomsApi {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    pub async fn list_rooms(&self) -> Result<RoomsResponse, ApiError> {
        self.client.get("/rooms").await
    }

    pub async fn get_room(&self, id: i64) -> Result<Room, ApiError> {
        self.client.get(&format!("/rooms/{}", id)).await
    }

    /// Rooms free for the whole of `[start, end)` with at least `min_capacity` seats.
    pub async fn available_rooms(
        &self,
        start: Timestamp,
        end: Timestamp,
        min_capacity: Option<i64>,
    ) -> Result<AvailableRoomsResponse, ApiError> {
        let mut query = vec![("start", start.to_rfc3339()), ("end", end.to_rfc3339())];
        if let Some(capacity) = min_capacity {
            query.push(("capacity", capacity.to_string()));
        }
        self.client.get_with("/rooms/available", &query).await
    }

    pub async fn create_room(&self, payload: &RoomPayload) -> Result<Room, ApiError> {
        self.client.post("/rooms", payload).await
    }

    pub async fn update_room(&self, id: i64, payload: &RoomPayload) -> Result<Room, ApiError> {
        self.client.put(&format!("/rooms/{}", id), payload).await
    }

    pub async fn delete_room(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&format!("/rooms/{}", id)).await
    }

    /// Reservations starting on any day in `start..=end`, optionally for one room.
    pub async fn reservations_by_date(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        room_id: Option<i64>,
    ) -> Result<ReservationsByDateResponse, ApiError> {
        let mut query = vec![
            ("start", start.format("%Y-%m-%d").to_string()),
            ("end", end.format("%Y-%m-%d").to_string()),
        ];
        if let Some(room_id) = room_id {
            query.push(("room_id", room_id.to_string()));
        }
        self.client.get_with("/reservations/by-date", &query).await
    }

    pub async fn get_reservation(&self, id: i64) -> Result<Reservation, ApiError> {
        self.client.get(&format!("/reservations/{}", id)).await
    }

    pub async fn create_reservation(&self, payload: &ReservationPayload) -> Result<Reservation, ApiError> {
        self.client.post("/reservations", payload).await
    }

    pub async fn update_reservation(&self, id: i64, payload: &ReservationPayload) -> Result<Reservation, ApiError> {
        self.client.put(&format!("/reservations/{}", id), payload).await
    }

    pub async fn delete_reservation(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&format!("/reservations/{}", id)).await
    }
}
