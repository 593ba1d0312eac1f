//! Fun Observance Table
//!
//! Curated niche observances that make good coloring themes, keyed by
//! month and day. Only exact-date matches count; there is no window.

/// Look up the fun observance for a given month/day, if any.
pub fn observance_for(month: u32, day: u32) -> Option<&'static str> {
    OBSERVANCES
        .iter()
        .find(|(m, d, _)| *m == month && *d == day)
        .map(|(_, _, name)| *name)
}

const OBSERVANCES: &[(u32, u32, &str)] = &[
    // January (winter, indoors)
    (1, 4, "World Braille Day"),
    (1, 5, "National Bird Day"),
    (1, 20, "Penguin Awareness Day"),
    (1, 24, "National Peanut Butter Day"),
    (1, 28, "National Lego Day"),
    (1, 29, "National Puzzle Day"),
    // February (love, cold)
    (2, 2, "Groundhog Day"),
    (2, 9, "National Pizza Day"),
    (2, 11, "International Day of Women and Girls in Science"),
    (2, 17, "Random Acts of Kindness Day"),
    (2, 27, "International Polar Bear Day"),
    // March (spring, nature)
    (3, 1, "World Wildlife Day"),
    (3, 3, "World Wildlife Day"),
    (3, 14, "Pi Day (Math & Pie)"),
    (3, 20, "World Frog Day"),
    (3, 22, "World Water Day"),
    (3, 23, "National Puppy Day"),
    // April (earth, fantasy)
    (4, 3, "World Party Day"),
    (4, 9, "National Unicorn Day"),
    (4, 21, "World Creativity and Innovation Day"),
    (4, 22, "Earth Day"),
    (4, 25, "World Penguin Day"),
    (4, 30, "International Jazz Day"),
    // May (space, flowers)
    (5, 4, "Star Wars Day"),
    (5, 5, "National Astronaut Day"),
    (5, 20, "World Bee Day"),
    (5, 23, "World Turtle Day"),
    (5, 28, "National Hamburger Day"),
    // June (summer, ocean)
    (6, 3, "World Bicycle Day"),
    (6, 4, "National Cheese Day"),
    (6, 8, "World Oceans Day"),
    (6, 21, "International Yoga Day"),
    (6, 27, "National Sunglasses Day"),
    // July (food, heat)
    (7, 7, "World Chocolate Day"),
    (7, 14, "Shark Awareness Day"),
    (7, 16, "World Snake Day"),
    (7, 17, "World Emoji Day"),
    (7, 20, "International Chess Day"),
    (7, 29, "International Tiger Day"),
    // August (animals, activity)
    (8, 8, "International Cat Day"),
    (8, 10, "World Lion Day"),
    (8, 12, "World Elephant Day"),
    (8, 19, "World Photography Day"),
    (8, 26, "National Dog Day"),
    // September (school, fall)
    (9, 6, "National Read a Book Day"),
    (9, 12, "National Video Games Day"),
    (9, 13, "International Chocolate Day"),
    (9, 19, "Talk Like a Pirate Day"),
    (9, 22, "Hobbit Day"),
    // October (spooky, harvest)
    (10, 4, "World Animal Day"),
    (10, 5, "World Teachers' Day"),
    (10, 9, "World Post Day (Mail & Letters)"),
    (10, 16, "World Food Day"),
    (10, 20, "International Sloth Day"),
    (10, 26, "National Pumpkin Day"),
    // November (family, creative)
    (11, 1, "National Author's Day"),
    (11, 8, "STEM/STEAM Day"),
    (11, 11, "Origami Day"),
    (11, 18, "National Princess Day"),
    // December (festive, winter)
    (12, 4, "National Cookie Day"),
    (12, 5, "International Ninja Day"),
    (12, 11, "International Mountain Day"),
    (12, 20, "National Ugly Sweater Day"),
];
