use super::RoomAssignment;
use crate::model::{Room, Service, Staff};

/// Choisit la cabine selon des règles ordonnées ; la première qui s'applique gagne.
///
/// 1. body scrub: the single equipped room, never a fallback;
/// 2. couples: capacity >= 2, the equipped room first;
/// 3. the preferred staff member's default room;
/// 4. the smallest active room accepting the category.
pub fn optimal_room(
    service: &Service,
    rooms: &[Room],
    preferred_staff: Option<&Staff>,
) -> RoomAssignment {
    if service.needs_body_scrub_room() {
        return body_scrub_room(rooms);
    }
    if service.is_couples_service {
        return couples_room(service, rooms);
    }
    if let Some(assignment) = preferred_staff.and_then(|staff| staff_default_room(service, rooms, staff)) {
        return assignment;
    }
    smallest_suitable_room(service, rooms)
}

fn body_scrub_room(rooms: &[Room]) -> RoomAssignment {
    match rooms.iter().find(|r| r.body_scrub_equipped && r.is_active) {
        Some(room) => {
            RoomAssignment::assigned(room, format!("Body scrub service requires {}", room.name))
        }
        None => RoomAssignment::failed(
            "No body scrub room available".to_string(),
            vec![
                "Body scrub services can only be booked in the body scrub room, which is not available"
                    .to_string(),
            ],
        ),
    }
}

fn couples_room(service: &Service, rooms: &[Room]) -> RoomAssignment {
    let capable: Vec<&Room> = rooms
        .iter()
        .filter(|r| r.is_active && r.is_couples_capable())
        .collect();

    if let Some(room) = capable.iter().find(|r| r.body_scrub_equipped) {
        return RoomAssignment::assigned(room, format!("Premium couples room {}", room.name));
    }
    if let Some(room) = capable
        .iter()
        .find(|r| r.accepts(service.category))
        .or_else(|| capable.first())
    {
        return RoomAssignment::assigned(
            room,
            format!("{} fits two guests for a couples service", room.name),
        );
    }

    let mut errors = vec!["Couples services require a room with capacity for 2 guests".to_string()];
    errors.extend(
        rooms
            .iter()
            .filter(|r| r.is_active && !r.is_couples_capable())
            .map(|r| format!("{} is single occupancy only", r.name)),
    );
    RoomAssignment::failed("No couples room available".to_string(), errors)
}

fn staff_default_room(service: &Service, rooms: &[Room], staff: &Staff) -> Option<RoomAssignment> {
    let room_id = staff.default_room_id.as_ref()?;
    if !staff.can_perform(service.category) {
        return None;
    }
    let room = rooms.iter().find(|r| &r.id == room_id && r.is_active)?;
    Some(RoomAssignment::assigned(
        room,
        format!("{}'s default room {}", staff.name, room.name),
    ))
}

fn smallest_suitable_room(service: &Service, rooms: &[Room]) -> RoomAssignment {
    let mut suitable: Vec<&Room> = rooms
        .iter()
        .filter(|r| r.is_active && r.accepts(service.category))
        .collect();
    // sort_by_key est stable : à capacité égale, l'ordre d'entrée est conservé
    suitable.sort_by_key(|r| r.capacity);

    match suitable.first() {
        Some(room) => RoomAssignment::assigned(
            room,
            format!("Smallest room available for {} services: {}", service.category, room.name),
        ),
        None => RoomAssignment::failed(
            "No suitable room".to_string(),
            vec![format!("No active room supports {} services", service.category)],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ServiceCategory;
    use rust_decimal::Decimal;

    fn room(name: &str, capacity: u32) -> Room {
        Room::new(name, capacity).unwrap()
    }

    fn service(category: ServiceCategory) -> Service {
        Service::new("svc", category, 60, Decimal::new(120, 0)).unwrap()
    }

    fn scrub_room() -> Room {
        let mut r = room("Room 3", 2);
        r.body_scrub_equipped = true;
        r
    }

    #[test]
    fn body_scrub_never_falls_back() {
        let scrub = service(ServiceCategory::BodyScrub);
        let mut closed = scrub_room();
        closed.is_active = false;
        let out = optimal_room(&scrub, &[room("Room 1", 1), closed], None);
        assert!(out.room.is_none());
        assert_eq!(out.errors.len(), 1);
    }

    #[test]
    fn couples_prefers_premium_room() {
        let svc = service(ServiceCategory::Massage).couples();
        let rooms = vec![room("Room 1", 1), room("Room 2", 2), scrub_room()];
        let out = optimal_room(&svc, &rooms, None);
        assert_eq!(out.room.unwrap().name, "Room 3");
        assert!(out.reason.starts_with("Premium couples room"));
    }

    #[test]
    fn couples_rejects_single_rooms_by_name() {
        let svc = service(ServiceCategory::Massage).couples();
        let out = optimal_room(&svc, &[room("Room 1", 1)], None);
        assert!(out.room.is_none());
        assert!(out.errors.iter().any(|e| e == "Room 1 is single occupancy only"));
    }

    #[test]
    fn staff_default_room_wins_for_single_services() {
        let svc = service(ServiceCategory::Facial);
        let big = room("Room 2", 2);
        let mut staff = Staff::new("Ana", [ServiceCategory::Facial], [1]);
        staff.default_room_id = Some(big.id.clone());
        let out = optimal_room(&svc, &[room("Room 1", 1), big], Some(&staff));
        assert_eq!(out.room.unwrap().name, "Room 2");
    }

    #[test]
    fn default_room_ignored_when_staff_not_capable() {
        let svc = service(ServiceCategory::Waxing);
        let big = room("Room 2", 2);
        let mut staff = Staff::new("Ana", [ServiceCategory::Facial], [1]);
        staff.default_room_id = Some(big.id.clone());
        let out = optimal_room(&svc, &[big, room("Room 1", 1)], Some(&staff));
        assert_eq!(out.room.unwrap().name, "Room 1");
    }

    #[test]
    fn smallest_room_with_stable_ties() {
        let svc = service(ServiceCategory::Facial);
        let mut wax_only = room("Wax", 1);
        wax_only.capabilities.insert(ServiceCategory::Waxing);
        let rooms = vec![room("Suite", 3), wax_only, room("A", 1), room("B", 1)];
        let out = optimal_room(&svc, &rooms, None);
        assert_eq!(out.room.unwrap().name, "A");
    }

    #[test]
    fn no_room_for_category_fails_with_reason() {
        let svc = service(ServiceCategory::Facial);
        let mut wax_only = room("Wax", 1);
        wax_only.capabilities.insert(ServiceCategory::Waxing);
        let out = optimal_room(&svc, &[wax_only], None);
        assert!(out.room.is_none());
        assert!(!out.reason.is_empty());
        assert_eq!(out.errors, vec!["No active room supports facial services".to_string()]);
    }
}
