//! English stop words long enough to survive keyword extraction.

pub(crate) const ENGLISH_STOP_WORDS: &[&str] = &[
    "about", "above", "across", "after", "afterwards", "again", "against", "almost", "alone",
    "along", "already", "also", "although", "always", "among", "amongst", "amount", "another",
    "anyhow", "anyone", "anything", "anyway", "anywhere", "around", "back", "became", "because",
    "become", "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below",
    "beside", "besides", "between", "beyond", "both", "bottom", "cannot", "could", "describe",
    "detail", "does", "done", "down", "due", "during", "each", "eight", "either", "eleven",
    "else", "elsewhere", "empty", "enough", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "fifteen", "fifty", "fill", "find", "first", "five", "former",
    "formerly", "forty", "found", "four", "from", "front", "full", "further", "give", "hence",
    "here", "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "himself", "however",
    "hundred", "indeed", "into", "itself", "keep", "last", "latter", "latterly", "least", "less",
    "made", "many", "meanwhile", "might", "mine", "more", "moreover", "most", "mostly", "move",
    "much", "must", "myself", "name", "namely", "neither", "never", "nevertheless", "next",
    "nine", "nobody", "none", "noone", "nothing", "nowhere", "often", "once", "only", "onto",
    "other", "others", "otherwise", "ours", "ourselves", "over", "part", "perhaps", "please",
    "rather", "same", "seem", "seemed", "seeming", "seems", "serious", "several", "should",
    "show", "side", "since", "sincere", "sixty", "some", "somehow", "someone", "something",
    "sometime", "sometimes", "somewhere", "still", "such", "take", "than", "that", "their",
    "them", "themselves", "then", "thence", "there", "thereafter", "thereby", "therefore",
    "therein", "thereupon", "these", "they", "thick", "thin", "third", "this", "those", "though",
    "three", "through", "throughout", "thru", "thus", "together", "too", "toward", "towards",
    "twelve", "twenty", "under", "until", "upon", "very", "were", "what", "whatever", "when",
    "whence", "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon",
    "wherever", "whether", "which", "while", "whither", "whoever", "whole", "whom", "whose",
    "will", "with", "within", "without", "would", "your", "yours", "yourself", "yourselves",
];
