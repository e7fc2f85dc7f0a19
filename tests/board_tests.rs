//! Board tests - grid model, line clearing, attack rows and items

use stackduel::core::{Board, Piece};
use stackduel::types::{Cell, ItemKind, PieceKind, Rotation, BOARD_HEIGHT, BOARD_WIDTH};

fn hard_drop(board: &Board, mut piece: Piece) -> Piece {
    while board.is_valid_position(&piece.moved(0, 1)) {
        piece = piece.moved(0, 1);
    }
    piece
}

fn vertical_i_at(column: i8) -> Piece {
    let piece = Piece {
        rotation: Rotation::West,
        ..Piece::new(PieceKind::I)
    };
    // West I sits one column right of its anchor
    piece.moved(column - piece.x - 1, 0)
}

#[test]
fn test_board_new_empty() {
    let board = Board::new();
    assert_eq!(board.width(), BOARD_WIDTH);
    assert_eq!(board.height(), BOARD_HEIGHT);

    for y in 0..BOARD_HEIGHT as i8 {
        for x in 0..BOARD_WIDTH as i8 {
            assert_eq!(board.get(x, y), Some(Cell::Empty), "cell ({x}, {y})");
        }
    }
    assert_eq!(board.attack_line_count(), 0);
}

#[test]
fn test_board_get_out_of_bounds() {
    let board = Board::new();

    assert_eq!(board.get(-1, 0), None);
    assert_eq!(board.get(0, -1), None);
    assert_eq!(board.get(BOARD_WIDTH as i8, 0), None);
    assert_eq!(board.get(0, BOARD_HEIGHT as i8), None);
}

#[test]
fn test_board_set_and_get() {
    let mut board = Board::new();

    assert!(board.set(5, 10, Cell::Block(PieceKind::T)));
    assert_eq!(board.get(5, 10), Some(Cell::Block(PieceKind::T)));

    assert!(board.set(5, 10, Cell::Empty));
    assert_eq!(board.get(5, 10), Some(Cell::Empty));

    assert!(!board.set(-1, 0, Cell::Attack));
    assert!(!board.set(0, BOARD_HEIGHT as i8, Cell::Attack));
}

#[test]
fn test_cell_codes_in_grid() {
    let mut board = Board::new();
    board.set(0, 19, Cell::Block(PieceKind::I));
    board.set(1, 19, Cell::Block(PieceKind::L));
    board.set(2, 19, Cell::Attack);
    board.set(3, 19, Cell::Bomb);

    let mut grid = [[0u8; 10]; 20];
    board.write_code_grid(&mut grid);
    assert_eq!(&grid[19][..5], &[1, 7, 8, 9, 0]);
}

#[test]
fn test_clear_lines_on_empty_board_is_noop() {
    let mut board = Board::new();
    let before = board.clone();
    assert_eq!(board.clear_lines(), 0);
    assert_eq!(board, before);
}

#[test]
fn test_valid_position_rules() {
    let mut board = Board::new();
    let piece = Piece::new(PieceKind::T);
    assert!(board.is_valid_position(&piece));

    // Above the top is free space
    assert!(board.is_valid_position(&piece.moved(0, -1)));

    // Off either side or below the floor is not
    assert!(!board.is_valid_position(&piece.moved(-4, 0)));
    assert!(!board.is_valid_position(&piece.moved(7, 0)));
    assert!(!board.is_valid_position(&piece.moved(0, 19)));

    // Overlap with a filled cell
    let (x, y) = piece.cells().next().unwrap();
    board.set(x, y, Cell::Attack);
    assert!(!board.is_valid_position(&piece));
}

#[test]
fn test_i_into_single_gap_clears_one_line() {
    let mut board = Board::from_rows(&["###.######"]);
    let mut piece = hard_drop(&board, vertical_i_at(3));
    assert!(piece.cells().all(|(x, _)| x == 3));

    board.place_piece(&mut piece);
    assert_eq!(board.clear_lines(), 1);

    // Three cells of the I remain, shifted down by one
    for y in 17..20 {
        assert_eq!(board.get(3, y), Some(Cell::Block(PieceKind::I)));
    }
    assert_eq!(board.get(3, 16), Some(Cell::Empty));
    assert_eq!(board.get(0, 19), Some(Cell::Empty));
}

#[test]
fn test_clear_full_rows_reports_rows_bottom_up() {
    let mut board = Board::from_rows(&[
        "##########",
        "#.........",
        "##########",
    ]);
    let cleared = board.clear_full_rows();
    assert_eq!(cleared.as_slice(), &[19, 17]);
    assert_eq!(board.get(0, 19), Some(Cell::Block(PieceKind::O)));
    assert_eq!(board.get(1, 19), Some(Cell::Empty));
}

#[test]
fn test_placement_never_writes_outside_board() {
    let mut board = Board::new();
    let mut piece = Piece {
        rotation: Rotation::East,
        ..Piece::new(PieceKind::I)
    }
    .moved(0, -3);

    board.place_piece(&mut piece);
    let written = board.cells().iter().filter(|c| !c.is_empty()).count();
    assert_eq!(written, 1);
}

#[test]
fn test_add_attack_lines_leaves_one_gap() {
    let mut board = Board::new();
    board.add_attack_lines(2, 6);

    for y in 18..20 {
        for x in 0..BOARD_WIDTH as i8 {
            let expected = if x == 6 { Cell::Empty } else { Cell::Attack };
            assert_eq!(board.get(x, y), Some(expected));
        }
    }
    assert_eq!(board.get(0, 17), Some(Cell::Empty));
    assert_eq!(board.attack_line_count(), 2);
}

#[test]
fn test_add_attack_lines_pushes_stack_up() {
    let mut board = Board::from_rows(&["#........."]);
    board.add_attack_lines(3, 0);
    assert_eq!(board.get(0, 16), Some(Cell::Block(PieceKind::O)));
    assert_eq!(board.attack_line_count(), 3);
}

#[test]
fn test_attack_cap_trims_oldest_rows() {
    let mut board = Board::new();
    board.add_attack_lines(8, 1);
    board.add_attack_lines(5, 4);

    assert_eq!(board.attack_line_count(), 10);
    assert!(board.is_attack_lines_full());
    // The newest five rows carry the new gap
    for y in 15..20 {
        assert_eq!(board.get(4, y), Some(Cell::Empty));
    }
    assert_eq!(board.get(1, 14), Some(Cell::Empty));
    assert_eq!(board.get(0, 9), Some(Cell::Empty));
}

#[test]
fn test_adding_to_full_board_stays_at_cap() {
    let mut board = Board::new();
    board.add_attack_lines(10, 0);
    board.add_attack_lines(10, 9);
    board.add_attack_lines(3, 5);
    assert_eq!(board.attack_line_count(), 10);
}

#[test]
fn test_clearing_attack_row_recounts_attacks() {
    let mut board = Board::new();
    board.add_attack_lines(2, 0);
    board.set(0, 18, Cell::Block(PieceKind::O));

    assert_eq!(board.clear_lines(), 1);
    assert_eq!(board.attack_line_count(), 1);
}

#[test]
fn test_bomb_clears_cross_without_counting() {
    let mut board = Board::from_rows(&[
        "#.........",
        "#.........",
        "#####.####",
    ]);
    let mut bomb = Piece::with_item(PieceKind::O, 0, ItemKind::Bomb).moved(-3, 0);
    bomb = hard_drop(&board, bomb);
    board.place_piece(&mut bomb);
    let (bx, by, _) = bomb.item_position().unwrap();

    assert_eq!(board.process_item_effects(&bomb), 0);
    for x in 0..BOARD_WIDTH as i8 {
        assert_eq!(board.get(x, by), Some(Cell::Empty));
    }
    for y in 0..BOARD_HEIGHT as i8 {
        assert_eq!(board.get(bx, y), Some(Cell::Empty));
    }
}

#[test]
fn test_line_clear_item_removes_partial_row() {
    let mut board = Board::from_rows(&["#........."]);
    let mut piece = Piece::with_item(PieceKind::O, 2, ItemKind::LineClear);
    piece = hard_drop(&board, piece);
    board.place_piece(&mut piece);
    let (_, y, _) = piece.item_position().unwrap();
    assert_eq!(y, 19);

    assert_eq!(board.process_item_effects(&piece), 1);
    assert_eq!(board.get(0, 19), Some(Cell::Empty));
    assert_eq!(board.item(4, 19), None);
}

#[test]
fn test_weight_tunnels_to_floor() {
    let mut board = Board::from_rows(&["##########", "##########"]);
    let mut weight = Piece::new(PieceKind::Weight);
    weight = hard_drop(&board, weight);

    while board.process_weight_effect(&mut weight) {}
    assert!(weight.landed);
    assert_eq!(weight.bottom_row(), 19);

    board.place_piece(&mut weight);
    // Columns 3..=6 were punched through on the bottom rows
    assert_eq!(board.get(3, 19), Some(Cell::Block(PieceKind::Weight)));
    assert_eq!(board.get(0, 19), Some(Cell::Block(PieceKind::O)));
}

#[test]
fn test_column_heights_and_holes() {
    let board = Board::from_rows(&[
        "#.........",
        "..........",
        "#.#.......",
    ]);
    let heights = board.column_heights();
    assert_eq!(heights[0], 3);
    assert_eq!(heights[1], 0);
    assert_eq!(heights[2], 1);
    assert_eq!(board.count_holes(), 1);
}
